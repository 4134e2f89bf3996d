// requirement.rs - Component requirements and their canonical key
//
// A requirement either demands a component or forbids it. Any slice of
// requirements collapses to one RequirementSet (sorted, deduplicated),
// which is the identity used for listener batches and cached views.

use crate::ecs::{ArchetypeLayout, Component, ComponentId, Schema};
use smallvec::SmallVec;
use std::cmp::Ordering;

/// A single presence condition on one component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// The component must be present.
    Require(ComponentId),
    /// The component must be absent.
    Exclude(ComponentId),
}

impl Requirement {
    pub fn require<T: Component>() -> Self {
        Requirement::Require(T::ID)
    }

    pub fn exclude<T: Component>() -> Self {
        Requirement::Exclude(T::ID)
    }

    #[inline]
    pub fn component(self) -> ComponentId {
        match self {
            Requirement::Require(id) | Requirement::Exclude(id) => id,
        }
    }

    #[inline]
    pub fn is_exclude(self) -> bool {
        matches!(self, Requirement::Exclude(_))
    }

    /// Same component, opposite polarity.
    #[inline]
    pub fn negated(self) -> Self {
        match self {
            Requirement::Require(id) => Requirement::Exclude(id),
            Requirement::Exclude(id) => Requirement::Require(id),
        }
    }

    #[inline]
    pub fn satisfied_by(self, layout: &ArchetypeLayout) -> bool {
        match self {
            Requirement::Require(id) => layout.contains(id),
            Requirement::Exclude(id) => !layout.contains(id),
        }
    }
}

// Component id first, then Require before Exclude.
impl Ord for Requirement {
    fn cmp(&self, other: &Self) -> Ordering {
        self.component()
            .cmp(&other.component())
            .then(self.is_exclude().cmp(&other.is_exclude()))
    }
}

impl PartialOrd for Requirement {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Canonical form of a requirement list.
///
/// Two lists that differ only in order or repetition produce equal sets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RequirementSet {
    terms: SmallVec<[Requirement; 4]>,
}

impl RequirementSet {
    pub fn new(requirements: &[Requirement]) -> Self {
        requirements.iter().copied().collect()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Requirement] {
        &self.terms
    }

    pub fn iter(&self) -> impl Iterator<Item = Requirement> + '_ {
        self.terms.iter().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// True when a component is both required and excluded.
    ///
    /// Such a set is legal but can never match anything.
    pub fn is_contradictory(&self) -> bool {
        self.terms
            .windows(2)
            .any(|pair| pair[0].component() == pair[1].component())
    }

    pub fn satisfied_by(&self, layout: &ArchetypeLayout) -> bool {
        self.terms.iter().all(|term| term.satisfied_by(layout))
    }

    /// Render the set with component names, e.g. `position, !velocity`.
    pub fn describe(&self, schema: &Schema) -> String {
        let mut out = String::new();
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if term.is_exclude() {
                out.push('!');
            }
            match schema.name_of(term.component()) {
                Some(name) => out.push_str(name),
                None => {
                    out.push('#');
                    out.push_str(&term.component().to_string());
                }
            }
        }
        out
    }
}

impl FromIterator<Requirement> for RequirementSet {
    fn from_iter<I: IntoIterator<Item = Requirement>>(iter: I) -> Self {
        let mut terms: SmallVec<[Requirement; 4]> = iter.into_iter().collect();
        terms.sort_unstable();
        terms.dedup();
        Self { terms }
    }
}

impl From<&[Requirement]> for RequirementSet {
    fn from(requirements: &[Requirement]) -> Self {
        Self::new(requirements)
    }
}
