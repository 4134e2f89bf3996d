// entity_list.rs - Dense entity collection with O(1) membership
//
// Entities live in a packed Vec; a side map tracks each one's index.
// Removal swaps the last entity into the hole, so iteration order is
// insertion order only until the first removal.

use crate::ecs::{Entity, EntityId};
use rustc_hash::FxHashMap;

#[derive(Clone, Debug, Default)]
pub struct EntityList {
    entities: Vec<Entity>,
    index: FxHashMap<EntityId, usize>,
}

impl EntityList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity. Returns false if it was already present.
    pub fn push(&mut self, entity: Entity) -> bool {
        let id = entity.id();
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id, self.entities.len());
        self.entities.push(entity);
        true
    }

    /// Swap-remove an entity. Returns false if it was not present.
    pub fn remove(&mut self, entity: &Entity) -> bool {
        self.remove_id(entity.id()).is_some()
    }

    pub fn remove_id(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.index.remove(&id)?;
        let removed = self.entities.swap_remove(slot);
        if let Some(moved) = self.entities.get(slot) {
            self.index.insert(moved.id(), slot);
        }
        Some(removed)
    }

    #[inline]
    pub fn contains(&self, entity: &Entity) -> bool {
        self.index.contains_key(&entity.id())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[inline]
    pub fn get(&self, position: usize) -> Option<&Entity> {
        self.entities.get(position)
    }

    #[inline]
    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    pub fn to_vec(&self) -> Vec<Entity> {
        self.entities.clone()
    }

    /// Move every entity out, leaving the list empty.
    pub fn drain(&mut self) -> Vec<Entity> {
        self.index.clear();
        std::mem::take(&mut self.entities)
    }
}

impl<'a> IntoIterator for &'a EntityList {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{EntityBuilder, EntityStore, Schema};

    struct Tag;
    crate::define_component!(Tag, 1, "tag");

    fn entities(n: usize) -> (EntityStore, Vec<Entity>) {
        let store = EntityStore::new(Schema::builder().with::<Tag>().build().unwrap());
        let made = (0..n).map(|_| store.create(EntityBuilder::new())).collect();
        (store, made)
    }

    fn assert_index_consistent(list: &EntityList) {
        for (i, entity) in list.iter().enumerate() {
            assert_eq!(list.index[&entity.id()], i);
        }
        assert_eq!(list.index.len(), list.len());
    }

    #[test]
    fn push_is_idempotent() {
        let (_store, made) = entities(2);
        let mut list = EntityList::new();
        assert!(list.push(made[0].clone()));
        assert!(!list.push(made[0].clone()));
        assert!(list.push(made[1].clone()));
        assert_eq!(list.len(), 2);
        assert_index_consistent(&list);
    }

    #[test]
    fn removal_moves_last_entity_into_hole() {
        let (_store, made) = entities(3);
        let mut list = EntityList::new();
        for entity in &made {
            list.push(entity.clone());
        }

        assert!(list.remove(&made[0]));
        assert_eq!(list.as_slice(), &[made[2].clone(), made[1].clone()]);
        assert_index_consistent(&list);

        assert!(!list.remove(&made[0]));
        assert!(list.remove(&made[1]));
        assert_eq!(list.as_slice(), &[made[2].clone()]);
        assert_index_consistent(&list);
    }

    #[test]
    fn removing_the_tail_keeps_order() {
        let (_store, made) = entities(3);
        let mut list = EntityList::new();
        for entity in &made {
            list.push(entity.clone());
        }
        list.remove(&made[2]);
        assert_eq!(list.as_slice(), &made[..2]);
        assert_index_consistent(&list);
    }

    #[test]
    fn drain_empties_the_list() {
        let (_store, made) = entities(2);
        let mut list = EntityList::new();
        list.push(made[0].clone());
        list.push(made[1].clone());
        assert_eq!(list.to_vec(), made);
        let taken = list.drain();
        assert_eq!(taken, made);
        assert!(list.is_empty());
        assert!(!list.contains(&made[0]));
    }
}
