//! Document to fragments.
//!
//! Every inline requirement block is persisted to the fragment store and
//! replaced by an include mark. Traceability moves out of the blocks into
//! link and derived marks at the tail of the document, next to memory marks
//! for identifiers that dropped out of this revision.

use std::{collections::BTreeSet, io::Write};

use tracing::instrument;

use super::{isolate_id, write_lines, EngineError, Preprocessed};
use crate::{
    domain::{
        requirement::BODY, IdFactory, IdSyntax, Identifier, Mark, MarkKind, Reference,
        Requirement, TraceGraph,
    },
    storage::{FragmentStore, Saved},
};

/// Counts of what a split run did to the fragment store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitSummary {
    /// Fragments created or rewritten.
    pub written: usize,
    /// Fragments whose stored content was already identical.
    pub unchanged: usize,
    /// Blocks left inline because no identifier could be generated.
    pub unnamed: usize,
}

/// How an open field ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Termination {
    /// Seeded inline: the next blank line ends it.
    NotRequired,
    /// Opened bare: a blank line ends it, the first content line turns it
    /// into [`Termination::Required`].
    Maybe,
    /// Only an end-of-field mark ends it.
    Required,
}

/// Where a plain line inside a block goes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Body,
    Field { name: String, termination: Termination },
}

/// Result of feeding a plain line to an open field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Append the line to the field, which continues as given.
    Append(Termination),
    /// Close the field and append the line to the body.
    Close,
}

impl Termination {
    fn step(self, blank: bool) -> Step {
        match (self, blank) {
            (Self::NotRequired | Self::Maybe, true) => Step::Close,
            (Self::NotRequired, false) => Step::Append(Self::NotRequired),
            (Self::Maybe | Self::Required, false) | (Self::Required, true) => {
                Step::Append(Self::Required)
            }
        }
    }
}

/// A requirement block being read.
#[derive(Debug)]
struct Block {
    opened_at: usize,
    id: Option<Identifier>,
    requirement: Requirement,
    references: BTreeSet<Reference>,
    cursor: Cursor,
}

impl Block {
    fn new(opened_at: usize, id: Option<Identifier>) -> Self {
        Self {
            opened_at,
            id,
            requirement: Requirement::new(),
            references: BTreeSet::new(),
            cursor: Cursor::Body,
        }
    }

    fn feed(&mut self, line: &str) {
        let cursor = std::mem::replace(&mut self.cursor, Cursor::Body);
        match cursor {
            Cursor::Body => self.requirement.push_line(BODY, line),
            Cursor::Field { name, termination } => {
                let blank = line.trim().is_empty();
                match termination.step(blank) {
                    Step::Append(termination) => {
                        self.requirement.push_line(&name, line);
                        self.cursor = Cursor::Field { name, termination };
                    }
                    Step::Close => self.requirement.push_line(BODY, line),
                }
            }
        }
    }

    /// Opens a field from the payload of a field mark.
    fn open_field(&mut self, payload: &str, syntax: IdSyntax, line: usize) {
        let (name, inline) = payload
            .split_once(char::is_whitespace)
            .map_or((payload, ""), |(name, rest)| (name, rest.trim()));

        if name.is_empty() || !syntax.accepts(name) {
            tracing::warn!("line {line}: field mark without a valid field name");
            return;
        }
        if name == BODY {
            tracing::warn!("line {line}: '{BODY}' is reserved for the requirement body");
            return;
        }

        if self.requirement.field(name).is_some() {
            tracing::warn!("line {line}: field '{name}' reopened, appending to it");
        }
        self.requirement.open_field(name);
        let termination = if inline.is_empty() {
            Termination::Maybe
        } else {
            self.requirement.push_line(name, inline);
            Termination::NotRequired
        };
        self.cursor = Cursor::Field {
            name: name.to_string(),
            termination,
        };
    }

    /// Handles a reference or field mark met inside the block.
    fn apply(&mut self, mark: Mark<'_>, syntax: IdSyntax, number: usize) {
        match mark.kind {
            MarkKind::Reference => {
                if let Some(id) = isolate_id(mark.payload, syntax, number) {
                    self.references.insert(Reference::Id(id));
                } else if mark.payload.is_empty() {
                    tracing::warn!("line {number}: {} mark without identifier", mark.kind);
                }
                self.cursor = Cursor::Body;
            }
            MarkKind::Derived => {
                self.references.insert(Reference::Derived);
                self.cursor = Cursor::Body;
            }
            MarkKind::BeginField => self.open_field(mark.payload, syntax, number),
            _ => self.cursor = Cursor::Body,
        }
    }

    /// The block written back inline, for when it cannot be persisted.
    fn inline(&self) -> Vec<String> {
        let mut lines = vec![MarkKind::BeginRequirement.tag().to_string()];
        for reference in &self.references {
            match reference {
                Reference::Derived => lines.push(MarkKind::Derived.tag().to_string()),
                Reference::Id(id) => lines.push(MarkKind::Reference.line(id)),
            }
        }
        lines.extend(self.requirement.render());
        lines.push(MarkKind::EndRequirement.tag().to_string());
        lines
    }
}

struct Splitter<'a, W> {
    factory: &'a mut IdFactory,
    preprocessed: &'a Preprocessed,
    store: &'a FragmentStore,
    out: &'a mut W,
    syntax: IdSyntax,
    cited: BTreeSet<Identifier>,
    links: TraceGraph,
    summary: SplitSummary,
}

impl<W: Write> Splitter<'_, W> {
    fn run(&mut self, lines: &[String]) -> Result<(), EngineError> {
        let mut block: Option<Block> = None;

        for (index, line) in lines.iter().enumerate() {
            let number = index + 1;
            let Some(mark) = Mark::classify(line) else {
                match block.as_mut() {
                    Some(open) => open.feed(line),
                    None => writeln!(self.out, "{line}")?,
                }
                continue;
            };

            match mark.kind {
                MarkKind::BeginRequirement => {
                    if let Some(open) = block.take() {
                        tracing::warn!(
                            "line {number}: requirement opened at line {} is not closed",
                            open.opened_at
                        );
                        self.finalize(open)?;
                    }
                    block = Some(Block::new(number, self.explicit_id(mark.payload, number)));
                }
                MarkKind::EndRequirement => match block.take() {
                    Some(open) => self.finalize(open)?,
                    None => tracing::warn!("line {number}: {} mark outside of any requirement", mark.kind),
                },
                MarkKind::Memory | MarkKind::Link => {}
                MarkKind::Reference
                | MarkKind::Derived
                | MarkKind::BeginField
                | MarkKind::EndField => match block.as_mut() {
                    Some(open) => open.apply(mark, self.syntax, number),
                    None => self.outside(mark, line, number)?,
                },
                _ => {
                    if let Some(open) = &block {
                        tracing::warn!(
                            "line {number}: {} mark inside the requirement opened at line {}",
                            mark.kind,
                            open.opened_at
                        );
                    }
                    self.outside(mark, line, number)?;
                }
            }
        }

        if let Some(open) = block.take() {
            tracing::warn!("requirement opened at line {} is not closed", open.opened_at);
            self.finalize(open)?;
        }

        self.write_tail()
    }

    /// Handles a mark met between requirement blocks.
    fn outside(&mut self, mark: Mark<'_>, line: &str, number: usize) -> Result<(), EngineError> {
        match mark.kind {
            // tail form, already read by the preprocessor
            MarkKind::Derived if !mark.payload.is_empty() => {}
            MarkKind::Reference | MarkKind::Derived | MarkKind::BeginField | MarkKind::EndField => {
                tracing::warn!("line {number}: {} mark outside of any requirement", mark.kind);
            }
            MarkKind::Include => {
                self.carry(mark.payload, number);
                writeln!(self.out, "{line}")?;
            }
            _ => writeln!(self.out, "{line}")?,
        }
        Ok(())
    }

    /// The explicit identifier of a block, unless an earlier block of this
    /// run or an include anywhere in the document already uses it.
    fn explicit_id(&self, payload: &str, line: usize) -> Option<Identifier> {
        let id = Identifier::parse(payload, self.syntax).ok()?;
        if self.cited.contains(&id) || self.preprocessed.included.contains(&id) {
            tracing::error!("line {line}: '{id}' identifier already used, generating a new one");
            return None;
        }
        Some(id)
    }

    /// Keeps the traceability of a requirement that is already included.
    fn carry(&mut self, payload: &str, line: usize) {
        let Some(id) = isolate_id(payload, self.syntax, line) else {
            return;
        };
        let references = self
            .preprocessed
            .graph
            .references(&id)
            .cloned()
            .unwrap_or_default();
        self.links.set(id.clone(), references);
        self.cited.insert(id);
    }

    fn finalize(&mut self, block: Block) -> Result<(), EngineError> {
        let id = match block.id.clone() {
            Some(id) => Some(id),
            None => self.factory.allocate(&block.requirement.body_text()),
        };

        let Some(id) = id else {
            tracing::error!(
                "requirement opened at line {} is kept inline: no identifier available",
                block.opened_at
            );
            self.summary.unnamed += 1;
            write_lines(self.out, block.inline())?;
            return Ok(());
        };

        match self.store.save(&id, &block.requirement)? {
            Saved::Written => self.summary.written += 1,
            Saved::Unchanged => self.summary.unchanged += 1,
        }
        writeln!(self.out, "{}", MarkKind::Include.line(&id))?;

        self.links.set(id.clone(), block.references);
        self.cited.insert(id);
        Ok(())
    }

    fn write_tail(&mut self) -> Result<(), EngineError> {
        let forgotten = self.factory.iter().filter(|id| !self.cited.contains(*id));
        write_lines(self.out, forgotten.map(|id| MarkKind::Memory.line(id)))?;

        for (id, reference) in self.links.pairs() {
            let line = match reference {
                Reference::Derived => MarkKind::Derived.line(id),
                Reference::Id(other) => MarkKind::Link.line(&format!("{id} {other}")),
            };
            writeln!(self.out, "{line}")?;
        }
        Ok(())
    }
}

/// Splits a document into fragments and a rewritten document.
///
/// `factory` must already hold the identifiers reserved by
/// [`preprocess`](super::preprocess), which also provides the traceability
/// of requirements that were included before this run.
///
/// # Errors
///
/// Fails when a fragment cannot be written or the output cannot be written
/// to. Everything else is logged and skipped.
#[instrument(skip_all)]
pub fn split<W: Write>(
    lines: &[String],
    factory: &mut IdFactory,
    preprocessed: &Preprocessed,
    store: &FragmentStore,
    out: &mut W,
) -> Result<SplitSummary, EngineError> {
    let syntax = factory.syntax();
    let mut splitter = Splitter {
        factory,
        preprocessed,
        store,
        out,
        syntax,
        cited: BTreeSet::new(),
        links: TraceGraph::new(),
        summary: SplitSummary::default(),
    };
    splitter.run(lines)?;

    let summary = splitter.summary;
    tracing::info!(
        "{} fragment(s) written, {} unchanged",
        summary.written,
        summary.unchanged
    );
    Ok(summary)
}
