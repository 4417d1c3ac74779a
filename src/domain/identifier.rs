use std::{borrow::Borrow, fmt, ops::Deref, str::FromStr, sync::LazyLock};

use non_empty_string::NonEmptyString;
use regex::Regex;
use serde::{Deserialize, Serialize};

static STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9A-Za-z-]+$").expect("static regex is valid"));

static RELAXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[0-9A-Za-z_-]+$").expect("static regex is valid"));

/// The character class accepted for requirement identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdSyntax {
    /// ASCII alphanumerics and hyphens.
    #[default]
    Strict,
    /// ASCII alphanumerics, hyphens and underscores.
    Underscore,
}

impl IdSyntax {
    fn regex(self) -> &'static Regex {
        match self {
            Self::Strict => &STRICT,
            Self::Underscore => &RELAXED,
        }
    }

    /// Whether `candidate` is a well-formed identifier under this syntax.
    #[must_use]
    pub fn accepts(self, candidate: &str) -> bool {
        self.regex().is_match(candidate)
    }
}

/// A validated requirement identifier.
///
/// Identifiers are either written explicitly after a `PRK-REQ` mark or
/// generated by the [`IdFactory`](super::IdFactory) from the requirement
/// content. They double as fragment file names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Identifier(NonEmptyString);

impl Identifier {
    /// Validates `s` against `syntax`.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Empty`] for an empty string and
    /// [`IdError::Malformed`] when a character falls outside the class.
    pub fn parse(s: &str, syntax: IdSyntax) -> Result<Self, IdError> {
        let non_empty = NonEmptyString::new(s.to_string()).map_err(|_| IdError::Empty)?;
        if !syntax.accepts(s) {
            return Err(IdError::Malformed(s.to_string()));
        }
        Ok(Self(non_empty))
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for Identifier {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Identifier {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, IdSyntax::Strict)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = IdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Errors raised while validating an identifier.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdError {
    /// No identifier was given.
    #[error("identifier is empty")]
    Empty,

    /// The identifier contains characters outside the accepted class.
    #[error("'{0}' identifier is ill formed")]
    Malformed(String),
}
