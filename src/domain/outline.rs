//! Heading hierarchy extracted from underline-style adornments.

use super::mark::Mark;

/// Characters that may form a heading underline.
const ADORNMENTS: &[char] = &[
    '=', '-', '`', ':', '.', '\'', '"', '~', '^', '_', '*', '+', '#', '<', '>',
];

/// Minimum run of identical adornment characters starting an underline.
const UNDERLINE_RUN: usize = 4;

/// One heading of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    /// Nesting level, 0 for the outermost headings.
    pub level: usize,
    /// Heading text.
    pub title: String,
}

/// Document headings in document order.
///
/// Levels are assigned by first appearance: the first adornment character
/// seen marks level 0, the next distinct one level 1, and so on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    entries: Vec<OutlineEntry>,
    adornments: Vec<char>,
}

impl Outline {
    /// Creates an empty outline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line with the line preceding it.
    ///
    /// When `line` is an underline and `previous` a plausible title, the
    /// title is recorded.
    pub fn observe(&mut self, previous: Option<&str>, line: &str) {
        let Some(adornment) = underline(line) else {
            return;
        };
        let Some(title) = previous.map(str::trim_end) else {
            return;
        };
        if title.trim().is_empty() || underline(title).is_some() || Mark::classify(title).is_some() {
            return;
        }

        let known = self.adornments.iter().position(|&c| c == adornment);
        let level = known.unwrap_or_else(|| {
            self.adornments.push(adornment);
            self.adornments.len() - 1
        });

        self.entries.push(OutlineEntry {
            level,
            title: title.trim().to_string(),
        });
    }

    /// Recorded headings.
    #[must_use]
    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }

    /// Whether no heading was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The adornment character of `line` if it starts with a run of identical
/// adornment characters.
fn underline(line: &str) -> Option<char> {
    let first = line.chars().next().filter(|c| ADORNMENTS.contains(c))?;
    let run = line.chars().take_while(|&c| c == first).count();
    (run >= UNDERLINE_RUN).then_some(first)
}
