//! Allocation of short, collision-free requirement identifiers.
//!
//! The factory owns the set of identifiers reserved during one command run.
//! Explicit identifiers found in the document are registered with
//! [`IdFactory::add`]; identifiers for anonymous requirements are derived from
//! their content with [`IdFactory::generate`], which always picks the shortest
//! unreserved window of the content footprint.

use std::{collections::BTreeSet, fmt, num::NonZeroUsize, ops::Range, str::FromStr};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::identifier::{IdSyntax, Identifier};

const ESCAPE: char = '%';
const SLOT: char = 'd';

/// A naming template with exactly one numeric slot.
///
/// In the textual form `%d` marks the slot and `%%` stands for a literal `%`.
/// Any other character, including a `%` followed by anything else, is kept
/// as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPattern {
    source: String,
    prefix: String,
    suffix: String,
}

impl IdPattern {
    /// Parses a pattern and checks that its expansions are valid identifiers
    /// under `syntax`.
    ///
    /// # Errors
    ///
    /// Fails when the slot is missing or repeated, or when the literal part of
    /// the pattern contains characters an identifier may not hold.
    pub fn parse(source: &str, syntax: IdSyntax) -> Result<Self, PatternError> {
        let (prefix, suffix) = split_pattern(source)?;
        let pattern = Self {
            source: source.to_string(),
            prefix,
            suffix,
        };
        if !syntax.accepts(&pattern.render("0")) {
            return Err(PatternError::Invalid(source.to_string()));
        }
        Ok(pattern)
    }

    /// Substitutes `digits` into the slot.
    #[must_use]
    pub fn render(&self, digits: &str) -> String {
        format!("{}{digits}{}", self.prefix, self.suffix)
    }

    /// Extracts the slot content of `id` if it was produced by this pattern
    /// from a run of decimal digits.
    #[must_use]
    pub fn slot<'a>(&self, id: &'a str) -> Option<&'a str> {
        let digits = id
            .strip_prefix(self.prefix.as_str())?
            .strip_suffix(self.suffix.as_str())?;
        (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(digits)
    }
}

/// Splits a pattern around its single slot, resolving escapes.
fn split_pattern(source: &str) -> Result<(String, String), PatternError> {
    let mut prefix = String::new();
    let mut suffix = String::new();
    let mut slots = 0;

    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        let target = if slots == 0 { &mut prefix } else { &mut suffix };
        if c != ESCAPE {
            target.push(c);
            continue;
        }
        match chars.peek() {
            Some(&ESCAPE) => {
                chars.next();
                target.push(ESCAPE);
            }
            Some(&SLOT) => {
                chars.next();
                slots += 1;
            }
            _ => target.push(ESCAPE),
        }
    }

    match slots {
        0 => Err(PatternError::NoSlot(source.to_string())),
        1 => Ok((prefix, suffix)),
        _ => Err(PatternError::ManySlots(source.to_string())),
    }
}

impl Default for IdPattern {
    fn default() -> Self {
        Self {
            source: "REQ-%d".to_string(),
            prefix: "REQ-".to_string(),
            suffix: String::new(),
        }
    }
}

impl fmt::Display for IdPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for IdPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, IdSyntax::Strict)
    }
}

/// Errors raised by pattern parsing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern has no `%d` slot.
    #[error("pattern '{0}' has no '%d' placeholder")]
    NoSlot(String),

    /// The pattern has more than one `%d` slot.
    #[error("pattern '{0}' has more than one '%d' placeholder")]
    ManySlots(String),

    /// The literal part of the pattern cannot appear in an identifier.
    #[error("pattern '{0}' does not expand to a valid identifier")]
    Invalid(String),
}

/// How identifiers are chosen for requirements that do not name one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Shortest unreserved window of the content hash.
    #[default]
    Hash,
    /// One more than the highest numbered identifier already reserved.
    Sequential,
}

/// Registry of reserved identifiers and generator of new ones.
#[derive(Debug, Clone)]
pub struct IdFactory {
    reserved: BTreeSet<Identifier>,
    pattern: IdPattern,
    width: NonZeroUsize,
    syntax: IdSyntax,
    strategy: IdStrategy,
}

impl Default for IdFactory {
    fn default() -> Self {
        Self::new(IdSyntax::default())
    }
}

impl IdFactory {
    /// Creates an empty factory using the default `REQ-%d` pattern and a
    /// width of 3.
    #[must_use]
    pub fn new(syntax: IdSyntax) -> Self {
        Self {
            reserved: BTreeSet::new(),
            pattern: IdPattern::default(),
            width: NonZeroUsize::new(3).unwrap_or(NonZeroUsize::MIN),
            syntax,
            strategy: IdStrategy::default(),
        }
    }

    /// The identifier syntax new identifiers are checked against.
    #[must_use]
    pub const fn syntax(&self) -> IdSyntax {
        self.syntax
    }

    /// Selects how [`allocate`](Self::allocate) names anonymous requirements.
    pub const fn set_strategy(&mut self, strategy: IdStrategy) {
        self.strategy = strategy;
    }

    /// Reconfigures the naming pattern and the minimum slot width.
    ///
    /// An invalid pattern is logged and the previous one kept; a zero width
    /// is ignored.
    pub fn configure(&mut self, pattern: &str, width: usize) {
        match IdPattern::parse(pattern, self.syntax) {
            Ok(pattern) => self.pattern = pattern,
            Err(e) => tracing::error!("{e}, keeping '{}'", self.pattern),
        }
        match NonZeroUsize::new(width) {
            Some(width) => self.width = width,
            None => tracing::warn!("identifier width must be positive, keeping {}", self.width),
        }
    }

    /// Records an identifier as reserved.
    ///
    /// Returns `true` if it was not reserved before.
    pub fn add(&mut self, id: Identifier) -> bool {
        self.reserved.insert(id)
    }

    /// Whether `id` is reserved.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.reserved.contains(id)
    }

    /// Iterates over the reserved identifiers in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.reserved.iter()
    }

    /// Number of reserved identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reserved.len()
    }

    /// Whether nothing is reserved yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reserved.is_empty()
    }

    /// Reserves a new identifier for `content` with the configured strategy.
    pub fn allocate(&mut self, content: &str) -> Option<Identifier> {
        match self.strategy {
            IdStrategy::Hash => self.generate(content),
            IdStrategy::Sequential => self.next_sequential(),
        }
    }

    /// Derives and reserves an identifier from `content`.
    ///
    /// Identical content and an identical reservation set always give the
    /// same result. Returns `None`, after logging an error, when every
    /// window of the footprint is already taken.
    pub fn generate(&mut self, content: &str) -> Option<Identifier> {
        let id = self
            .candidates(content)
            .find(|candidate| !self.reserved.contains(candidate));

        if let Some(id) = &id {
            self.reserved.insert(id.clone());
        } else {
            tracing::error!("cannot generate a new unique identifier");
        }
        id
    }

    /// Reserves the identifier following the highest numbered one that
    /// matches the pattern.
    pub fn next_sequential(&mut self) -> Option<Identifier> {
        let highest = self
            .reserved
            .iter()
            .filter_map(|id| self.pattern.slot(id))
            .filter_map(|digits| digits.parse::<u64>().ok())
            .max();
        let next = highest.map_or(Some(0), |n| n.checked_add(1));

        let id = next
            .map(|n| format!("{n:0width$}", width = self.width.get()))
            .and_then(|digits| Identifier::parse(&self.pattern.render(&digits), self.syntax).ok())
            .filter(|id| !self.reserved.contains(id));

        if let Some(id) = &id {
            self.reserved.insert(id.clone());
        } else {
            tracing::error!("cannot generate a new unique identifier");
        }
        id
    }

    /// All candidate identifiers for `content`, in order of preference.
    ///
    /// Candidates come from windows of the [footprint](footprint): first
    /// every window of exactly the configured width, then longer windows
    /// that do not start with a zero, shortest first.
    pub fn candidates(&self, content: &str) -> impl Iterator<Item = Identifier> + use<'_> {
        let footprint = footprint(content);
        let width = self.width.get();
        windows(footprint.len(), width).filter_map(move |range| {
            let window = &footprint[range];
            if window.len() > width && window.starts_with('0') {
                return None;
            }
            Identifier::parse(&self.pattern.render(window), self.syntax).ok()
        })
    }
}

impl<'a> IntoIterator for &'a IdFactory {
    type Item = &'a Identifier;
    type IntoIter = std::collections::btree_set::Iter<'a, Identifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.reserved.iter()
    }
}

/// The content footprint: the SHA-256 digest of `content`, read as one big
/// unsigned integer, written in decimal with its digits reversed.
///
/// The leading digits of a decimal rendering are poorly distributed; the
/// trailing ones are not, so reversing them spreads short windows evenly
/// over the identifier space.
#[must_use]
pub fn footprint(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    reversed_decimal(&digest)
}

/// Renders a big-endian unsigned integer in decimal, least significant digit
/// first.
fn reversed_decimal(bytes: &[u8]) -> String {
    let mut number = bytes.to_vec();
    let mut digits = String::new();

    while number.iter().any(|&b| b != 0) {
        let mut remainder = 0u32;
        for byte in &mut number {
            let value = (remainder << 8) | u32::from(*byte);
            // value < 2560, so the quotient fits a byte
            *byte = u8::try_from(value / 10).unwrap_or(u8::MAX);
            remainder = value % 10;
        }
        digits.push(char::from_digit(remainder, 10).unwrap_or('0'));
    }

    if digits.is_empty() {
        digits.push('0');
    }
    digits
}

/// Byte ranges of the candidate windows over a footprint of `len` digits:
/// every window of `width` digits, then every longer window, shortest first.
fn windows(len: usize, width: usize) -> impl Iterator<Item = Range<usize>> {
    let fixed = (0..(len + 1).saturating_sub(width)).map(move |start| start..start + width);
    let longer = (width + 1..=len)
        .flat_map(move |n| (0..=len - n).map(move |start| start..start + n));
    fixed.chain(longer)
}
