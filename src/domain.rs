//! Domain models for requirement documents.
//!
//! This module contains the core domain types: line marks, identifiers and
//! their factory, requirement records, the traceability graph, the document
//! outline and configuration.

/// Requirement records and their inline rendering.
pub mod requirement;
pub use requirement::Requirement;

mod config;
pub use config::{Config, StorageMode, DEFAULT_TEMPLATE};

/// Identifier syntax and validation.
pub mod identifier;
pub use identifier::{IdError, IdSyntax, Identifier};

pub mod id_factory;
pub use id_factory::{IdFactory, IdPattern, IdStrategy, PatternError};

pub mod mark;
pub use mark::{Mark, MarkKind};

pub mod outline;
pub use outline::{Outline, OutlineEntry};

pub mod trace;
pub use trace::{Citers, Reference, TraceGraph};
