//! Recognition of the reserved line prefixes ("marks") of the tagged document
//! format.

use std::fmt;

/// The kind of a recognised mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkKind {
    /// Opens an inline requirement block, optionally naming its identifier.
    BeginRequirement,
    /// Closes an inline requirement block.
    EndRequirement,
    /// Stands in for a requirement persisted as a fragment.
    Include,
    /// Inside a block: the requirement refines the named requirement.
    Reference,
    /// The requirement is derived, it refines no concrete requirement.
    Derived,
    /// Declares an identifier defined outside the document.
    ForwardReference,
    /// Keeps an identifier reserved although no block uses it any more.
    Memory,
    /// A persisted `id refId` traceability pair.
    Link,
    /// Opens a named field inside a requirement block.
    BeginField,
    /// Closes a named field.
    EndField,
    /// Placeholder for the requirement → reference matrix.
    MatrixDirect,
    /// Placeholder for the reference → requirement matrix.
    MatrixTransposed,
    /// Placeholder for the table of contents.
    TableOfContents,
}

impl MarkKind {
    /// Every mark kind, in classification order.
    pub const ALL: [Self; 13] = [
        Self::BeginRequirement,
        Self::EndRequirement,
        Self::Include,
        Self::Reference,
        Self::Derived,
        Self::ForwardReference,
        Self::Memory,
        Self::Link,
        Self::BeginField,
        Self::EndField,
        Self::MatrixDirect,
        Self::MatrixTransposed,
        Self::TableOfContents,
    ];

    /// The literal prefix of this mark.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::BeginRequirement => "PRK-REQ",
            Self::EndRequirement => "-- PRK-REQ",
            Self::Include => "PRK-INC",
            Self::Reference => "PRK-REF",
            Self::Derived => "PRK-DRV",
            Self::ForwardReference => "PRK-FWD",
            Self::Memory => "PRK-MEM",
            Self::Link => "PRK-LNK",
            Self::BeginField => "PRK-TAG",
            Self::EndField => "-- PRK-TAG",
            Self::MatrixDirect => "PRK-MTX",
            Self::MatrixTransposed => "PRK-XTM",
            Self::TableOfContents => "PRK-TOC",
        }
    }

    /// Renders a full mark line with the given payload.
    ///
    /// An empty payload yields the bare tag.
    #[must_use]
    pub fn line(self, payload: &str) -> String {
        if payload.is_empty() {
            self.tag().to_string()
        } else {
            format!("{} {payload}", self.tag())
        }
    }
}

impl fmt::Display for MarkKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A line recognised as a mark, with its trailing payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark<'a> {
    /// Which mark was recognised.
    pub kind: MarkKind,
    /// Text following the tag, with surrounding whitespace removed.
    pub payload: &'a str,
}

impl<'a> Mark<'a> {
    /// Classifies a line.
    ///
    /// A mark must start at column 0 and its tag must be followed by
    /// whitespace or the end of the line. Lines matching no mark are plain and
    /// yield `None`.
    #[must_use]
    pub fn classify(line: &'a str) -> Option<Self> {
        MarkKind::ALL.into_iter().find_map(|kind| {
            let rest = line.strip_prefix(kind.tag())?;
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                Some(Self {
                    kind,
                    payload: rest.trim(),
                })
            } else {
                None
            }
        })
    }

    /// The whitespace-separated words of the payload.
    pub fn words(self) -> impl Iterator<Item = &'a str> {
        self.payload.split_whitespace()
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("PRK-REQ", MarkKind::BeginRequirement, ""; "bare begin")]
    #[test_case("PRK-REQ A-1", MarkKind::BeginRequirement, "A-1"; "begin with id")]
    #[test_case("-- PRK-REQ", MarkKind::EndRequirement, ""; "end")]
    #[test_case("PRK-INC  B \r", MarkKind::Include, "B"; "include trims")]
    #[test_case("PRK-LNK A B", MarkKind::Link, "A B"; "link")]
    #[test_case("PRK-TAG owner Alice Smith", MarkKind::BeginField, "owner Alice Smith"; "field")]
    #[test_case("-- PRK-TAG", MarkKind::EndField, ""; "end field")]
    #[test_case("PRK-DRV", MarkKind::Derived, ""; "derived")]
    #[test_case("PRK-TOC", MarkKind::TableOfContents, ""; "toc")]
    fn recognises(line: &str, kind: MarkKind, payload: &str) {
        assert_eq!(Mark::classify(line), Some(Mark { kind, payload }));
    }

    #[test_case("Hello"; "prose")]
    #[test_case(" PRK-REQ"; "indented")]
    #[test_case("PRK-REQUIRED"; "longer word")]
    #[test_case("prk-req"; "lowercase")]
    #[test_case("--PRK-REQ"; "missing space")]
    fn plain(line: &str) {
        assert_eq!(Mark::classify(line), None);
    }

    #[test]
    fn every_tag_classifies_as_itself() {
        for kind in MarkKind::ALL {
            assert_eq!(Mark::classify(kind.tag()).map(|m| m.kind), Some(kind));
        }
    }

    #[test]
    fn line_rendering() {
        assert_eq!(MarkKind::Include.line("A"), "PRK-INC A");
        assert_eq!(MarkKind::EndRequirement.line(""), "-- PRK-REQ");
    }
}
