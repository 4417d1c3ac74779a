use crate::domain::{Outline, Reference, TraceGraph};

/// Cell standing for a derived marker in the direct matrix.
pub const DERIVED_LABEL: &str = "Derived requirement";

/// Cell of a referenced identifier no requirement of the document cites.
pub const UNREFINED_LABEL: &str = "Unrefined requirement";

const REQUIREMENT_HEADER: &str = "Requirement";
const REFERENCE_HEADER: &str = "Reference";

/// One matrix row: a key cell and the values listed against it.
type Row = (String, Vec<String>);

/// Each requirement against the identifiers it references.
#[must_use]
pub fn direct_matrix(graph: &TraceGraph) -> Vec<String> {
    let rows: Vec<Row> = graph
        .entries()
        .map(|(id, references)| {
            let cells = references
                .iter()
                .map(|reference| match reference {
                    Reference::Derived => DERIVED_LABEL.to_string(),
                    Reference::Id(other) => other.to_string(),
                })
                .collect();
            (id.to_string(), cells)
        })
        .collect();

    table((REQUIREMENT_HEADER, REFERENCE_HEADER), &rows)
}

/// Each referenced identifier against the requirements citing it.
///
/// A forward reference counts as a citer from outside the document, shown
/// as [`UNREFINED_LABEL`] when `sparse` is set. Rows left without any cell
/// are omitted.
#[must_use]
pub fn transposed_matrix(graph: &TraceGraph, sparse: bool) -> Vec<String> {
    let rows: Vec<Row> = graph
        .transposed()
        .into_iter()
        .filter_map(|(id, citers)| {
            let mut cells: Vec<String> =
                citers.requirements.iter().map(ToString::to_string).collect();
            if sparse && citers.external {
                cells.push(UNREFINED_LABEL.to_string());
            }
            (!cells.is_empty()).then(|| (id.to_string(), cells))
        })
        .collect();

    table((REFERENCE_HEADER, REQUIREMENT_HEADER), &rows)
}

/// A bullet list of the document headings, indented by level.
#[must_use]
pub fn outline(outline: &Outline) -> Vec<String> {
    outline
        .entries()
        .iter()
        .map(|entry| format!("{:indent$}+ `{}`_", "", entry.title, indent = 2 * entry.level))
        .collect()
}

/// Lays out a bordered two column table.
///
/// A row with several values spans several lines, the key cell left blank
/// after the first; a row with none shows an empty value.
fn table(header: (&str, &str), rows: &[Row]) -> Vec<String> {
    let key_width = rows
        .iter()
        .map(|(key, _)| key.chars().count())
        .chain([header.0.chars().count()])
        .max()
        .unwrap_or_default();
    let value_width = rows
        .iter()
        .flat_map(|(_, values)| values.iter().map(|value| value.chars().count()))
        .chain([header.1.chars().count()])
        .max()
        .unwrap_or_default();

    let border = format!("+{}+{}+", "-".repeat(key_width + 2), "-".repeat(value_width + 2));
    let line = |key: &str, value: &str| {
        format!("| {key:<key_width$} | {value:<value_width$} |")
    };

    let mut lines = vec![border.clone(), line(header.0, header.1), border.clone()];
    for (key, values) in rows {
        if values.is_empty() {
            lines.push(line(key, ""));
        }
        for (index, value) in values.iter().enumerate() {
            lines.push(line(if index == 0 { key } else { "" }, value));
        }
        lines.push(border.clone());
    }
    lines
}
