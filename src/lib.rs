//! Requirement management with any SCM
//!
//! A requirements document is best edited as a whole, in a single file, but
//! best stored split, one requirement per fragment, so that version control
//! shows how each requirement evolves. Publishing it needs yet another
//! rendering. This crate moves a document between those three views:
//!
//! - [`split`](engine::split) replaces each inline requirement block with an
//!   include mark and writes the block to a fragment,
//! - [`merge`](engine::merge) expands include marks back into inline blocks,
//! - [`publish`](engine::publish) renders includes, traceability matrices and
//!   the table of contents for publication.

pub mod domain;
pub use domain::{Config, IdFactory, Identifier, Mark, MarkKind, Requirement, TraceGraph};

/// Transformation engines operating on a document's lines.
pub mod engine;
pub use engine::{EngineError, Preprocessed};

/// Filesystem storage of requirement fragments.
pub mod storage;
pub use storage::{FragmentStore, StorageError};
