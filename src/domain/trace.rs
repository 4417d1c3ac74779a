//! The traceability graph: which requirement refines which.

use std::collections::{BTreeMap, BTreeSet};

use super::identifier::Identifier;

/// One outgoing edge of a requirement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Reference {
    /// The requirement is derived: it refines nothing concrete.
    Derived,
    /// The requirement refines the named requirement.
    Id(Identifier),
}

impl Reference {
    /// The concrete identifier, if any.
    #[must_use]
    pub const fn id(&self) -> Option<&Identifier> {
        match self {
            Self::Derived => None,
            Self::Id(id) => Some(id),
        }
    }
}

/// Requirements citing one referenced identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Citers {
    /// Requirements of the document that reference the identifier.
    pub requirements: BTreeSet<Identifier>,
    /// Whether the identifier was declared by a forward reference.
    pub external: bool,
}

/// Mapping from requirement to the set of its references.
///
/// A requirement present with an empty set is still part of the graph: it
/// shows up as a matrix row with no reference. Forward references are kept
/// apart, as if cited by a source outside the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceGraph {
    links: BTreeMap<Identifier, BTreeSet<Reference>>,
    external: BTreeSet<Identifier>,
}

impl TraceGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure `id` has an entry, possibly empty.
    pub fn declare(&mut self, id: Identifier) {
        self.links.entry(id).or_default();
    }

    /// Records that `id` references `reference`.
    pub fn link(&mut self, id: Identifier, reference: Reference) {
        self.links.entry(id).or_default().insert(reference);
    }

    /// Replaces every reference of `id`.
    pub fn set(&mut self, id: Identifier, references: BTreeSet<Reference>) {
        self.links.insert(id, references);
    }

    /// Records `id` as referenced from outside the document.
    pub fn forward(&mut self, id: Identifier) {
        self.external.insert(id);
    }

    /// References of `id`, if it has an entry.
    #[must_use]
    pub fn references(&self, id: &str) -> Option<&BTreeSet<Reference>> {
        self.links.get(id)
    }

    /// Whether `id` is marked as derived.
    #[must_use]
    pub fn is_derived(&self, id: &str) -> bool {
        self.references(id)
            .is_some_and(|references| references.contains(&Reference::Derived))
    }

    /// Requirements with an entry, in identifier order.
    pub fn requirements(&self) -> impl Iterator<Item = &Identifier> {
        self.links.keys()
    }

    /// Requirements with their references, in identifier order.
    pub fn entries(&self) -> impl Iterator<Item = (&Identifier, &BTreeSet<Reference>)> {
        self.links.iter()
    }

    /// Every `(requirement, reference)` pair, sorted.
    pub fn pairs(&self) -> impl Iterator<Item = (&Identifier, &Reference)> {
        self.links
            .iter()
            .flat_map(|(id, references)| references.iter().map(move |reference| (id, reference)))
    }

    /// Forward-referenced identifiers.
    pub fn forwards(&self) -> impl Iterator<Item = &Identifier> {
        self.external.iter()
    }

    /// Whether the graph has neither requirement nor forward reference.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.external.is_empty()
    }

    /// The reverse view: every concretely referenced or forward-declared
    /// identifier, with the requirements citing it.
    ///
    /// Derived markers have no counterpart here.
    #[must_use]
    pub fn transposed(&self) -> BTreeMap<Identifier, Citers> {
        let mut result: BTreeMap<Identifier, Citers> = BTreeMap::new();

        for (id, reference) in self.pairs() {
            if let Reference::Id(target) = reference {
                result
                    .entry(target.clone())
                    .or_default()
                    .requirements
                    .insert(id.clone());
            }
        }
        for id in &self.external {
            result.entry(id.clone()).or_default().external = true;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identifier {
        s.parse().unwrap()
    }

    fn sample() -> TraceGraph {
        let mut graph = TraceGraph::new();
        graph.link(id("A"), Reference::Id(id("B")));
        graph.link(id("A"), Reference::Id(id("C")));
        graph.link(id("D"), Reference::Id(id("B")));
        graph.link(id("E"), Reference::Derived);
        graph.declare(id("F"));
        graph.forward(id("X"));
        graph
    }

    #[test]
    fn declared_requirement_has_empty_entry() {
        let graph = sample();
        assert_eq!(graph.references("F"), Some(&BTreeSet::new()));
        assert_eq!(graph.references("missing"), None);
    }

    #[test]
    fn derived_marker_is_tracked() {
        let graph = sample();
        assert!(graph.is_derived("E"));
        assert!(!graph.is_derived("A"));
    }

    #[test]
    fn pairs_are_sorted() {
        let graph = sample();
        let pairs: Vec<(String, Option<String>)> = graph
            .pairs()
            .map(|(a, r)| (a.to_string(), r.id().map(ToString::to_string)))
            .collect();
        assert_eq!(
            pairs,
            [
                ("A".to_string(), Some("B".to_string())),
                ("A".to_string(), Some("C".to_string())),
                ("D".to_string(), Some("B".to_string())),
                ("E".to_string(), None),
            ]
        );
    }

    #[test]
    fn transposition_mirrors_concrete_pairs() {
        let graph = sample();
        let transposed = graph.transposed();

        for (requirement, reference) in graph.pairs() {
            if let Some(target) = reference.id() {
                assert!(transposed[target].requirements.contains(requirement));
            }
        }
        for (target, citers) in &transposed {
            for requirement in &citers.requirements {
                assert!(graph.references(requirement).unwrap().contains(&Reference::Id(target.clone())));
            }
        }
    }

    #[test]
    fn forward_references_are_external_rows() {
        let transposed = sample().transposed();
        let keys: Vec<&str> = transposed.keys().map(Identifier::as_str).collect();
        assert_eq!(keys, ["B", "C", "X"]);
        assert!(transposed[&id("X")].external);
        assert!(transposed[&id("X")].requirements.is_empty());
    }
}
