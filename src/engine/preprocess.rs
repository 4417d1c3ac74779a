//! The forward pass every command starts with.

use std::collections::BTreeSet;

use tracing::instrument;

use super::isolate_id;
use crate::domain::{IdFactory, Identifier, Mark, MarkKind, Outline, Reference, TraceGraph};

/// What a document declares before it is transformed.
#[derive(Debug, Clone, Default)]
pub struct Preprocessed {
    /// Traceability recorded by link, derived, include and forward marks.
    pub graph: TraceGraph,
    /// Headings, for the table of contents.
    pub outline: Outline,
    /// Identifiers of the requirements the document defines, inline or
    /// through an include.
    pub defined: BTreeSet<Identifier>,
    /// Identifiers of the requirements included from the fragment store.
    pub included: BTreeSet<Identifier>,
}

impl Preprocessed {
    /// Every `(requirement, reference)` pair; `None` stands for a derived
    /// marker.
    pub fn pairs(&self) -> impl Iterator<Item = (&Identifier, Option<&Identifier>)> {
        self.graph
            .pairs()
            .map(|(id, reference)| (id, reference.id()))
    }

    /// Identifiers referenced by a requirement or declared forward.
    #[must_use]
    pub fn referenced(&self) -> Vec<Identifier> {
        self.graph.transposed().into_keys().collect()
    }
}

/// Collects reserved identifiers into `factory` and builds the traceability
/// graph and outline of `lines`.
///
/// Memory, include and explicit inline identifiers are reserved. An explicit
/// identifier that is already reserved is reported as not unique and left
/// alone, so that later passes can tell it apart.
#[instrument(skip_all, fields(lines = lines.len()))]
pub fn preprocess(lines: &[String], factory: &mut IdFactory) -> Preprocessed {
    let syntax = factory.syntax();
    let mut result = Preprocessed::default();
    let mut current: Option<Identifier> = None;
    let mut previous: Option<&str> = None;

    for (index, line) in lines.iter().enumerate() {
        let number = index + 1;
        result.outline.observe(previous, line);
        previous = Some(line.as_str());

        let Some(mark) = Mark::classify(line) else {
            continue;
        };

        match mark.kind {
            MarkKind::Memory => {
                if let Some(id) = isolate_id(mark.payload, syntax, number) {
                    factory.add(id);
                }
            }
            MarkKind::BeginRequirement => {
                current = isolate_id(mark.payload, syntax, number);
                if let Some(id) = &current {
                    if factory.contains(id) {
                        tracing::error!("line {number}: '{id}' identifier is not unique");
                    } else {
                        factory.add(id.clone());
                    }
                    result.defined.insert(id.clone());
                }
            }
            MarkKind::EndRequirement => current = None,
            MarkKind::Include => {
                if let Some(id) = isolate_id(mark.payload, syntax, number) {
                    factory.add(id.clone());
                    result.graph.declare(id.clone());
                    result.defined.insert(id.clone());
                    result.included.insert(id);
                }
            }
            MarkKind::Link => {
                let mut words = mark.words();
                let pair = (words.next(), words.next());
                if let (Some(id), Some(reference)) = pair {
                    let id = isolate_id(id, syntax, number);
                    let reference = isolate_id(reference, syntax, number);
                    if let (Some(id), Some(reference)) = (id, reference) {
                        result.graph.link(id, Reference::Id(reference));
                    }
                } else {
                    tracing::warn!("line {number}: {} mark needs two identifiers", mark.kind);
                }
            }
            MarkKind::Derived => {
                let id = if mark.payload.is_empty() {
                    current.clone()
                } else {
                    isolate_id(mark.payload, syntax, number)
                };
                if let Some(id) = id {
                    result.graph.link(id, Reference::Derived);
                }
            }
            MarkKind::ForwardReference => {
                if let Some(id) = isolate_id(mark.payload, syntax, number) {
                    result.graph.forward(id);
                }
            }
            _ => {}
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{factory, lines};

    fn id(s: &str) -> Identifier {
        s.parse().unwrap()
    }

    #[test]
    fn reserves_memory_include_and_inline_ids() {
        let mut factory = factory();
        preprocess(
            &lines("PRK-MEM OLD\nPRK-INC A\nPRK-REQ B\nbody\n-- PRK-REQ\nPRK-REQ\nanonymous\n-- PRK-REQ"),
            &mut factory,
        );
        let reserved: Vec<&str> = factory.iter().map(Identifier::as_str).collect();
        assert_eq!(reserved, ["A", "B", "OLD"]);
    }

    #[test]
    fn malformed_ids_are_not_reserved() {
        let mut factory = factory();
        let pre = preprocess(&lines("PRK-REQ not valid!\n-- PRK-REQ\nPRK-MEM a/b"), &mut factory);
        assert!(factory.is_empty());
        assert!(pre.defined.is_empty());
    }

    #[test]
    fn duplicate_inline_id_is_reported_once_reserved() {
        let mut factory = factory();
        let pre = preprocess(
            &lines("PRK-REQ A\none\n-- PRK-REQ\nPRK-REQ A\ntwo\n-- PRK-REQ"),
            &mut factory,
        );
        assert_eq!(factory.len(), 1);
        assert_eq!(pre.defined.len(), 1);
    }

    #[test]
    fn included_ids_are_kept_apart() {
        let mut factory = factory();
        let pre = preprocess(
            &lines("PRK-REQ A\nnew\n-- PRK-REQ\nPRK-INC A\nPRK-INC B"),
            &mut factory,
        );
        assert_eq!(pre.included, BTreeSet::from([id("A"), id("B")]));
        assert_eq!(pre.defined, BTreeSet::from([id("A"), id("B")]));
    }

    #[test]
    fn builds_traceability() {
        let mut factory = factory();
        let pre = preprocess(
            &lines("PRK-INC A\nPRK-INC B\nPRK-INC C\nPRK-LNK A B\nPRK-DRV C\nPRK-FWD EXT-1"),
            &mut factory,
        );

        assert_eq!(
            pre.graph.references("A"),
            Some(&BTreeSet::from([Reference::Id(id("B"))]))
        );
        assert_eq!(pre.graph.references("B"), Some(&BTreeSet::new()));
        assert!(pre.graph.is_derived("C"));
        assert_eq!(pre.graph.forwards().collect::<Vec<_>>(), [&id("EXT-1")]);
        assert_eq!(pre.referenced(), [id("B"), id("EXT-1")]);
    }

    #[test]
    fn derived_marker_inside_a_named_block_applies_to_it() {
        let mut factory = factory();
        let pre = preprocess(&lines("PRK-REQ A\nPRK-DRV\ntext\n-- PRK-REQ\nPRK-DRV"), &mut factory);
        assert!(pre.graph.is_derived("A"));
        assert_eq!(pre.graph.requirements().count(), 1);
    }

    #[test]
    fn link_with_a_single_id_is_ignored() {
        let mut factory = factory();
        let pre = preprocess(&lines("PRK-LNK A"), &mut factory);
        assert!(pre.graph.is_empty());
    }

    #[test]
    fn collects_outline() {
        let mut factory = factory();
        let pre = preprocess(&lines("Title\n=====\n\nPRK-INC A\n\nPart\n-----"), &mut factory);
        let titles: Vec<&str> = pre.outline.entries().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Title", "Part"]);
    }
}
