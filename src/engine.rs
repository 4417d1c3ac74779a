use std::io;

use crate::storage::StorageError;

mod preprocess;
pub use preprocess::{preprocess, Preprocessed};

mod split;
pub use split::{split, SplitSummary};

mod merge;
pub use merge::merge;

mod publish;
pub use publish::publish;

/// Presentation of traceability matrices and the table of contents.
pub mod render;

/// Errors that abort a transformation.
///
/// Problems local to one line (malformed identifiers, marks out of context)
/// are logged and skipped instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A fragment could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The transformed document could not be written.
    #[error("failed to write the output stream")]
    Output(#[from] io::Error),
}

/// Validates the identifier payload of a mark, logging what is wrong with it.
///
/// Returns `None` for an empty payload without complaint.
fn isolate_id(
    payload: &str,
    syntax: crate::domain::IdSyntax,
    line: usize,
) -> Option<crate::Identifier> {
    if payload.is_empty() {
        return None;
    }
    match crate::Identifier::parse(payload, syntax) {
        Ok(id) => Some(id),
        Err(e) => {
            tracing::error!("line {line}: {e}");
            None
        }
    }
}

/// Writes each line followed by a newline.
fn write_lines<W, I>(out: &mut W, lines: I) -> io::Result<()>
where
    W: io::Write,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    for line in lines {
        writeln!(out, "{}", line.as_ref())?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{FragmentStore, IdFactory};

    pub fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    pub fn output(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).unwrap()
    }

    pub fn store(tmp: &tempfile::TempDir) -> FragmentStore {
        FragmentStore::new(
            tmp.path().to_path_buf(),
            "prk",
            crate::domain::StorageMode::File,
        )
    }

    pub fn factory() -> IdFactory {
        IdFactory::default()
    }
}
