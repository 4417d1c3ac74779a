//! Publication text, read-only.

use std::io::Write;

use tracing::instrument;

use super::{isolate_id, render, write_lines, EngineError, Preprocessed};
use crate::{
    domain::{Config, Identifier, Mark, MarkKind},
    storage::FragmentStore,
};

/// Substitutes `{id}` and `{content}` in a publication template.
#[must_use]
pub fn fill_template(template: &str, id: &Identifier, content: &str) -> String {
    template.replace("{id}", id).replace("{content}", content)
}

/// Renders a document for publication.
///
/// Includes are expanded through the configured template, matrix and table
/// of contents marks are replaced by their rendering, and bookkeeping marks
/// are dropped. Nothing is written to the fragment store.
///
/// # Errors
///
/// Fails when an included fragment is missing or unreadable, or when the
/// output cannot be written to.
#[instrument(skip_all)]
pub fn publish<W: Write>(
    lines: &[String],
    preprocessed: &Preprocessed,
    store: &FragmentStore,
    config: &Config,
    out: &mut W,
) -> Result<(), EngineError> {
    let syntax = config.syntax();

    for (index, line) in lines.iter().enumerate() {
        let number = index + 1;
        let Some(mark) = Mark::classify(line) else {
            writeln!(out, "{line}")?;
            continue;
        };

        match mark.kind {
            MarkKind::Include => match isolate_id(mark.payload, syntax, number) {
                Some(id) => {
                    let rendered = store.load(&id)?.render().join("\n");
                    let content = rendered.trim_matches('\n');
                    write!(out, "{}", fill_template(&config.template, &id, content))?;
                }
                None => writeln!(out, "{line}")?,
            },
            MarkKind::MatrixDirect => write_lines(out, render::direct_matrix(&preprocessed.graph))?,
            MarkKind::MatrixTransposed => write_lines(
                out,
                render::transposed_matrix(&preprocessed.graph, config.sparse),
            )?,
            MarkKind::TableOfContents => {
                if !preprocessed.outline.is_empty() {
                    write_lines(out, render::outline(&preprocessed.outline))?;
                }
            }
            MarkKind::Memory | MarkKind::Link | MarkKind::Derived | MarkKind::ForwardReference => {}
            MarkKind::BeginRequirement | MarkKind::EndRequirement if !config.permissive => {
                tracing::warn!("line {number}: dropping inline {} mark", mark.kind);
            }
            _ => writeln!(out, "{line}")?,
        }
    }

    Ok(())
}
