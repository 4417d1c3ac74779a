//! Fragments back into a document.

use std::{collections::BTreeSet, io::Write};

use tracing::instrument;

use super::{isolate_id, write_lines, EngineError, Preprocessed};
use crate::{
    domain::{IdSyntax, Identifier, Mark, MarkKind, Reference},
    storage::FragmentStore,
};

/// Expands every include mark into the inline requirement block it stands
/// for, with its references restored from the traceability graph.
///
/// Memory, link and tail derived marks are consumed. Inline requirement
/// marks already present are passed through when `permissive`, dropped
/// otherwise. The document ends with one memory mark per identifier in use.
///
/// # Errors
///
/// Fails when an included fragment is missing or unreadable, or when the
/// output cannot be written to.
#[instrument(skip_all)]
pub fn merge<W: Write>(
    lines: &[String],
    preprocessed: &Preprocessed,
    store: &FragmentStore,
    syntax: IdSyntax,
    permissive: bool,
    out: &mut W,
) -> Result<(), EngineError> {
    let mut used: BTreeSet<Identifier> = BTreeSet::new();

    for (index, line) in lines.iter().enumerate() {
        let number = index + 1;
        let Some(mark) = Mark::classify(line) else {
            writeln!(out, "{line}")?;
            continue;
        };

        match mark.kind {
            MarkKind::Include => match isolate_id(mark.payload, syntax, number) {
                Some(id) => {
                    expand(&id, preprocessed, store, out)?;
                    used.insert(id);
                }
                None => writeln!(out, "{line}")?,
            },
            MarkKind::Memory => used.extend(isolate_id(mark.payload, syntax, number)),
            MarkKind::Link => {}
            MarkKind::Derived if !mark.payload.is_empty() => {}
            MarkKind::BeginRequirement | MarkKind::EndRequirement => {
                if permissive {
                    if mark.kind == MarkKind::BeginRequirement {
                        used.extend(Identifier::parse(mark.payload, syntax).ok());
                    }
                    writeln!(out, "{line}")?;
                } else {
                    tracing::warn!("line {number}: dropping inline {} mark", mark.kind);
                }
            }
            _ => writeln!(out, "{line}")?,
        }
    }

    write_lines(out, used.iter().map(|id| MarkKind::Memory.line(id)))?;
    Ok(())
}

fn expand<W: Write>(
    id: &Identifier,
    preprocessed: &Preprocessed,
    store: &FragmentStore,
    out: &mut W,
) -> Result<(), EngineError> {
    let requirement = store.load(id)?;

    writeln!(out, "{}", MarkKind::BeginRequirement.line(id))?;
    for reference in preprocessed.graph.references(id).into_iter().flatten() {
        match reference {
            Reference::Derived => writeln!(out, "{}", MarkKind::Derived.tag())?,
            Reference::Id(other) => writeln!(out, "{}", MarkKind::Reference.line(other))?,
        }
    }
    write_lines(out, requirement.render())?;
    writeln!(out, "{}", MarkKind::EndRequirement.tag())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::{
        engine::{
            preprocess,
            test_support::{factory, lines, output, store},
        },
        storage::StorageError,
    };

    fn run(tmp: &TempDir, text: &str, permissive: bool) -> Result<String, EngineError> {
        let lines = lines(text);
        let pre = preprocess(&lines, &mut factory());
        let mut buffer = Vec::new();
        merge(&lines, &pre, &store(tmp), IdSyntax::Strict, permissive, &mut buffer)?;
        Ok(output(buffer))
    }

    #[test]
    fn include_expands_to_block() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("A.prk"), "Hello\n").unwrap();

        let out = run(&tmp, "Intro\nPRK-INC A\nOutro\n", false).unwrap();
        assert_eq!(out, "Intro\nPRK-REQ A\nHello\n-- PRK-REQ\nOutro\nPRK-MEM A\n");
    }

    #[test]
    fn references_are_restored() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("A.prk"), "refined\n").unwrap();
        fs::write(tmp.path().join("B.prk"), "base\n").unwrap();

        let out = run(
            &tmp,
            "PRK-INC B\nPRK-INC A\nPRK-LNK A C\nPRK-LNK A B\nPRK-DRV B\n",
            false,
        )
        .unwrap();
        assert_eq!(
            out,
            "PRK-REQ B\nPRK-DRV\nbase\n-- PRK-REQ\nPRK-REQ A\nPRK-REF B\nPRK-REF C\nrefined\n-- PRK-REQ\nPRK-MEM A\nPRK-MEM B\n"
        );
    }

    #[test]
    fn fields_are_rendered_inline() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("A");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("text.prk"), "Body\n").unwrap();
        fs::write(dir.join("owner.prk"), "Alice\n").unwrap();
        fs::write(dir.join("notes.prk"), "one\ntwo\n").unwrap();
        fs::write(dir.join("flag.prk"), "").unwrap();

        let out = run(&tmp, "PRK-INC A\n", false).unwrap();
        assert_eq!(
            out,
            "PRK-REQ A\nBody\nPRK-TAG flag\nPRK-TAG notes\none\ntwo\n-- PRK-TAG\nPRK-TAG owner Alice\n-- PRK-REQ\nPRK-MEM A\n"
        );
    }

    #[test]
    fn memory_marks_are_collected_at_the_end() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("B.prk"), "b\n").unwrap();

        let out = run(&tmp, "PRK-MEM OLD\nPRK-INC B\ntext\n", false).unwrap();
        assert_eq!(out, "PRK-REQ B\nb\n-- PRK-REQ\ntext\nPRK-MEM B\nPRK-MEM OLD\n");
    }

    #[test]
    fn stray_blocks_follow_permissiveness() {
        let tmp = TempDir::new().unwrap();
        let text = "PRK-REQ X\ninline\n-- PRK-REQ\n";

        assert_eq!(run(&tmp, text, false).unwrap(), "inline\n");
        assert_eq!(
            run(&tmp, text, true).unwrap(),
            "PRK-REQ X\ninline\n-- PRK-REQ\nPRK-MEM X\n"
        );
    }

    #[test]
    fn missing_fragment_fails() {
        let tmp = TempDir::new().unwrap();
        let result = run(&tmp, "PRK-INC A\n", false);
        assert!(matches!(
            result,
            Err(EngineError::Storage(StorageError::NotFound(id))) if id == "A"
        ));
    }
}
