// archetype.rs - Archetype identification and listener indexing
//
// An archetype is a unique set of component ids. Entities with the same
// component set share an archetype, and each archetype keeps the listener
// batches that match it, indexed by the requirement terms that can flip
// when an entity leaves or enters.

use crate::ecs::listener::ListenerBatch;
use crate::ecs::{ComponentId, EntityList, Requirement};
use rustc_hash::FxHashMap;
use slotmap::new_key_type;
use smallvec::SmallVec;
use std::rc::Rc;

new_key_type! {
    /// Store-local handle to an archetype.
    pub struct ArchetypeId;
}

/// A sorted, deduplicated set of component ids.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArchetypeLayout {
    components: SmallVec<[ComponentId; 8]>,
}

impl ArchetypeLayout {
    /// Create a layout from a list of component IDs.
    ///
    /// The input will be sorted and deduplicated.
    pub fn from_components(ids: impl IntoIterator<Item = ComponentId>) -> Self {
        let mut components: SmallVec<[ComponentId; 8]> = ids.into_iter().collect();
        components.sort_unstable();
        components.dedup();
        Self { components }
    }

    #[inline]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.binary_search(&id).is_ok()
    }

    #[inline]
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

pub(crate) struct Archetype {
    pub(crate) layout: ArchetypeLayout,
    pub(crate) entities: EntityList,
    batches: Vec<Rc<ListenerBatch>>,
    by_trigger: FxHashMap<Requirement, Vec<Rc<ListenerBatch>>>,
}

impl Archetype {
    pub(crate) fn new(layout: ArchetypeLayout) -> Self {
        Self {
            layout,
            entities: EntityList::new(),
            batches: Vec::new(),
            by_trigger: FxHashMap::default(),
        }
    }

    /// Register a batch whose requirements this archetype satisfies.
    pub(crate) fn attach(&mut self, batch: &Rc<ListenerBatch>) {
        debug_assert!(batch.requirements().satisfied_by(&self.layout));
        if self.batches.iter().any(|b| Rc::ptr_eq(b, batch)) {
            return;
        }
        self.batches.push(batch.clone());
        for term in batch.requirements().iter() {
            self.by_trigger.entry(term).or_default().push(batch.clone());
        }
    }

    pub(crate) fn detach(&mut self, batch: &Rc<ListenerBatch>) -> bool {
        let before = self.batches.len();
        self.batches.retain(|b| !Rc::ptr_eq(b, batch));
        if self.batches.len() == before {
            return false;
        }
        for term in batch.requirements().iter() {
            if let Some(list) = self.by_trigger.get_mut(&term) {
                list.retain(|b| !Rc::ptr_eq(b, batch));
                if list.is_empty() {
                    self.by_trigger.remove(&term);
                }
            }
        }
        true
    }

    #[inline]
    pub(crate) fn batches(&self) -> &[Rc<ListenerBatch>] {
        &self.batches
    }

    /// Batches containing `term` among their requirements.
    pub(crate) fn triggered_by(&self, term: Requirement) -> &[Rc<ListenerBatch>] {
        self.by_trigger
            .get(&term)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// No entities and no batches: safe to forget.
    pub(crate) fn is_idle(&self) -> bool {
        self.entities.is_empty() && self.batches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::RequirementSet;
    use Requirement::{Exclude, Require};

    #[test]
    fn layout_is_sorted_and_unique() {
        let layout = ArchetypeLayout::from_components(vec![3, 1, 3, 2]);
        assert_eq!(layout.components(), &[1, 2, 3]);
        assert!(layout.contains(2));
        assert!(!layout.contains(4));
    }

    #[test]
    fn equal_component_sets_share_a_layout() {
        let a = ArchetypeLayout::from_components(vec![5, 4]);
        let b = ArchetypeLayout::from_components([4, 5]);
        assert_eq!(a, b);
    }

    #[test]
    fn batches_are_indexed_by_each_term() {
        let mut archetype = Archetype::new(ArchetypeLayout::from_components(vec![1]));
        let batch = Rc::new(ListenerBatch::new(RequirementSet::new(&[Require(1), Exclude(2)])));

        archetype.attach(&batch);
        archetype.attach(&batch);
        assert_eq!(archetype.batches().len(), 1);
        assert_eq!(archetype.triggered_by(Require(1)).len(), 1);
        assert_eq!(archetype.triggered_by(Exclude(2)).len(), 1);
        assert!(archetype.triggered_by(Require(2)).is_empty());

        assert!(archetype.detach(&batch));
        assert!(!archetype.detach(&batch));
        assert!(archetype.triggered_by(Require(1)).is_empty());
        assert!(archetype.by_trigger.is_empty());
        assert!(archetype.is_idle());
    }
}
