use std::collections::BTreeMap;

use super::mark::MarkKind;

/// Name of the reserved field holding the requirement body.
pub const BODY: &str = "text";

/// The full content of one requirement: its body plus any named fields.
///
/// The body lives under the reserved [`BODY`] key, which is always present.
/// Other fields are kept sorted by name so that rendering and storage are
/// independent of the order fields were written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    fields: BTreeMap<String, Vec<String>>,
}

impl Default for Requirement {
    fn default() -> Self {
        Self::new()
    }
}

impl Requirement {
    /// Creates a requirement with an empty body and no fields.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::from([(BODY.to_string(), Vec::new())]),
        }
    }

    /// Creates a requirement whose body is `lines`.
    #[must_use]
    pub fn with_body(lines: Vec<String>) -> Self {
        Self {
            fields: BTreeMap::from([(BODY.to_string(), lines)]),
        }
    }

    /// The body lines.
    #[must_use]
    pub fn body(&self) -> &[String] {
        self.fields.get(BODY).map_or(&[], Vec::as_slice)
    }

    /// The lines of field `name`, the body included.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    /// Named fields other than the body, sorted by name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .filter(|(name, _)| name.as_str() != BODY)
            .map(|(name, lines)| (name.as_str(), lines.as_slice()))
    }

    /// Every field including the body, the body first.
    pub fn all_fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        std::iter::once((BODY, self.body())).chain(self.fields())
    }

    /// Whether the requirement carries fields besides its body.
    #[must_use]
    pub fn has_fields(&self) -> bool {
        self.fields.len() > 1
    }

    /// Starts field `name`, keeping existing content if it was already
    /// opened.
    pub fn open_field(&mut self, name: &str) {
        self.fields.entry(name.to_string()).or_default();
    }

    /// Replaces the content of field `name`.
    pub fn set_field(&mut self, name: &str, lines: Vec<String>) {
        self.fields.insert(name.to_string(), lines);
    }

    /// Appends a line to field `name`, creating it if needed.
    pub fn push_line(&mut self, name: &str, line: &str) {
        self.fields
            .entry(name.to_string())
            .or_default()
            .push(line.to_string());
    }

    /// The body as stored: each line terminated by a newline.
    ///
    /// This is also the content identifiers are generated from.
    #[must_use]
    pub fn body_text(&self) -> String {
        to_text(self.body())
    }

    /// Renders the requirement back to inline tagged lines.
    ///
    /// The body comes first, then each field in name order: a single
    /// non-empty line without surrounding whitespace is written inline after
    /// the field mark, an empty field
    /// is a bare field mark, anything longer is written as a block closed by
    /// an end-of-field mark.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        let mut lines = self.body().to_vec();

        for (name, content) in self.fields() {
            match content {
                [] => lines.push(MarkKind::BeginField.line(name)),
                [single] if !single.is_empty() && single.trim() == single => {
                    lines.push(MarkKind::BeginField.line(&format!("{name} {single}")));
                }
                _ => {
                    lines.push(MarkKind::BeginField.line(name));
                    lines.extend(content.iter().cloned());
                    lines.push(MarkKind::EndField.tag().to_string());
                }
            }
        }

        lines
    }
}

/// Joins lines, terminating each with a newline.
#[must_use]
pub fn to_text(lines: &[String]) -> String {
    lines.iter().fold(String::new(), |mut text, line| {
        text.push_str(line);
        text.push('\n');
        text
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn new_requirement_has_only_an_empty_body() {
        let requirement = Requirement::new();
        assert!(requirement.body().is_empty());
        assert!(!requirement.has_fields());
        assert_eq!(requirement.fields().count(), 0);
        assert_eq!(requirement.all_fields().count(), 1);
    }

    #[test]
    fn body_text_terminates_every_line() {
        let requirement = Requirement::with_body(lines("Hello\n\nWorld"));
        assert_eq!(requirement.body_text(), "Hello\n\nWorld\n");
        assert_eq!(Requirement::new().body_text(), "");
    }

    #[test]
    fn fields_are_sorted_and_exclude_the_body() {
        let mut requirement = Requirement::new();
        requirement.push_line("status", "Draft");
        requirement.push_line("owner", "Alice");
        let names: Vec<&str> = requirement.fields().map(|(name, _)| name).collect();
        assert_eq!(names, ["owner", "status"]);
        let all: Vec<&str> = requirement.all_fields().map(|(name, _)| name).collect();
        assert_eq!(all, ["text", "owner", "status"]);
    }

    #[test]
    fn open_field_keeps_existing_content() {
        let mut requirement = Requirement::new();
        requirement.push_line("owner", "Alice");
        requirement.open_field("owner");
        assert_eq!(requirement.field("owner"), Some(&["Alice".to_string()][..]));
        requirement.open_field("empty");
        assert!(requirement.field("empty").is_some_and(<[String]>::is_empty));
        assert!(requirement.field("missing").is_none());
    }

    #[test]
    fn render_chooses_field_form_by_content() {
        let mut requirement = Requirement::with_body(lines("The system shall work."));
        requirement.set_field("owner", lines("Alice"));
        requirement.set_field("notes", lines("one\ntwo"));
        requirement.open_field("empty");

        assert_eq!(
            requirement.render(),
            lines(
                "The system shall work.\n\
                 PRK-TAG empty\n\
                 PRK-TAG notes\n\
                 one\n\
                 two\n\
                 -- PRK-TAG\n\
                 PRK-TAG owner Alice"
            )
        );
    }

    #[test]
    fn blank_single_line_field_renders_as_block() {
        let mut requirement = Requirement::new();
        requirement.set_field("gap", vec![String::new()]);
        assert_eq!(requirement.render(), lines("PRK-TAG gap\n\n-- PRK-TAG"));
    }

    #[test]
    fn padded_single_line_field_renders_as_block() {
        let mut requirement = Requirement::new();
        requirement.set_field("code", vec!["    indented".to_string()]);
        requirement.set_field("note", vec!["trailing ".to_string()]);
        assert_eq!(
            requirement.render(),
            lines("PRK-TAG code\n    indented\n-- PRK-TAG\nPRK-TAG note\ntrailing \n-- PRK-TAG")
        );
    }
}
