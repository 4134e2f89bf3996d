//! Entity handles and per-entity component access
//!
//! An `Entity` is a cheap, clonable handle to one entity's record. The
//! record owns the component values; the store only tracks which
//! archetype the entity currently lives in. Handles stay usable after
//! the entity is removed: reads and writes then touch the values only,
//! without any archetype movement or notifications.

use crate::ecs::store::StoreShared;
use crate::ecs::{ArchetypeId, ArchetypeLayout, Component, ComponentId, Requirement, Schema, StoreError};
use std::any::{Any, TypeId};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

/// Stable entity identifier, unique for the lifetime of a store.
///
/// Ids are never reused, so an id also serves as a creation sequence number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) struct EntityRecord {
    id: EntityId,
    schema: Rc<Schema>,
    slots: RefCell<Vec<Option<Box<dyn Any>>>>,
    /// Current archetype; `None` once the entity has been removed.
    pub(crate) archetype: Cell<Option<ArchetypeId>>,
}

impl EntityRecord {
    pub(crate) fn new(id: EntityId, schema: Rc<Schema>, slots: Vec<Option<Box<dyn Any>>>) -> Self {
        Self {
            id,
            schema,
            slots: RefCell::new(slots),
            archetype: Cell::new(None),
        }
    }
}

/// Handle to one entity.
///
/// Equality and hashing go by id; two handles to the same entity are equal.
#[derive(Clone)]
pub struct Entity {
    pub(crate) record: Rc<EntityRecord>,
    pub(crate) store: Weak<StoreShared>,
}

impl Entity {
    #[inline]
    pub fn id(&self) -> EntityId {
        self.record.id
    }

    /// Whether the entity is still part of its store.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.record.archetype.get().is_some()
    }

    pub fn has<T: Component>(&self) -> bool {
        self.slot_if_typed::<T>()
            .is_some_and(|slot| self.record.slots.borrow()[slot].is_some())
    }

    pub fn has_id(&self, id: ComponentId) -> bool {
        self.record
            .schema
            .slot_of(id)
            .is_some_and(|slot| self.record.slots.borrow()[slot].is_some())
    }

    /// Whether the entity's current components satisfy every requirement.
    pub fn matches(&self, requirements: &[Requirement]) -> bool {
        requirements.iter().all(|requirement| match *requirement {
            Requirement::Require(id) => self.has_id(id),
            Requirement::Exclude(id) => !self.has_id(id),
        })
    }

    /// Ids of the components currently present, sorted.
    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.layout().components().to_vec()
    }

    /// Borrow a component.
    ///
    /// The borrow must be released before the entity is mutated again.
    pub fn get<T: Component>(&self) -> Result<Ref<'_, T>, StoreError> {
        let slot = self.slot_if_typed::<T>().ok_or_else(|| self.missing::<T>())?;
        Ref::filter_map(self.record.slots.borrow(), |slots| {
            slots[slot].as_ref().and_then(|value| value.downcast_ref::<T>())
        })
        .map_err(|_| self.missing::<T>())
    }

    /// Mutably borrow a component in place.
    ///
    /// In-place edits never change the component set, so nobody is notified.
    pub fn get_mut<T: Component>(&self) -> Result<RefMut<'_, T>, StoreError> {
        let slot = self.slot_if_typed::<T>().ok_or_else(|| self.missing::<T>())?;
        RefMut::filter_map(self.record.slots.borrow_mut(), |slots| {
            slots[slot].as_mut().and_then(|value| value.downcast_mut::<T>())
        })
        .map_err(|_| self.missing::<T>())
    }

    pub fn get_cloned<T: Component + Clone>(&self) -> Result<T, StoreError> {
        self.get::<T>().map(|value| (*value).clone())
    }

    /// Store a component value.
    ///
    /// Replacing an existing value is silent. Adding a new component moves
    /// the entity to its new archetype and notifies affected listeners
    /// before returning.
    ///
    /// # Panics
    /// If `T` is not part of the store's schema.
    pub fn set<T: Component>(&self, value: T) -> &Self {
        let slot = self
            .record
            .schema
            .expect_slot(T::ID, TypeId::of::<T>(), T::NAME);
        let gained = {
            let mut slots = self.record.slots.borrow_mut();
            let gained = slots[slot].is_none();
            slots[slot] = Some(Box::new(value));
            gained
        };
        if gained {
            self.presence_changed(Requirement::Require(T::ID));
        }
        self
    }

    /// Drop a component. Returns whether it was present.
    ///
    /// # Panics
    /// If `T` is not part of the store's schema.
    pub fn delete<T: Component>(&self) -> bool {
        let slot = self
            .record
            .schema
            .expect_slot(T::ID, TypeId::of::<T>(), T::NAME);
        let removed = self.record.slots.borrow_mut()[slot].take();
        match removed {
            Some(value) => {
                // Drop the value only after listeners have run.
                self.presence_changed(Requirement::Exclude(T::ID));
                drop(value);
                true
            }
            None => false,
        }
    }

    /// Remove and return a component value.
    ///
    /// # Panics
    /// If `T` is not part of the store's schema.
    pub fn take<T: Component>(&self) -> Result<T, StoreError> {
        let slot = self
            .record
            .schema
            .expect_slot(T::ID, TypeId::of::<T>(), T::NAME);
        let removed = self.record.slots.borrow_mut()[slot].take();
        let value = removed.ok_or_else(|| self.missing::<T>())?;
        self.presence_changed(Requirement::Exclude(T::ID));
        value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| self.missing::<T>())
    }

    pub(crate) fn layout(&self) -> ArchetypeLayout {
        let slots = self.record.slots.borrow();
        ArchetypeLayout::from_components(
            slots
                .iter()
                .enumerate()
                .filter(|(_, value)| value.is_some())
                .map(|(slot, _)| self.record.schema.id_at(slot)),
        )
    }

    fn presence_changed(&self, now: Requirement) {
        if !self.is_alive() {
            return;
        }
        if let Some(store) = self.store.upgrade() {
            store.presence_changed(self, now);
        }
    }

    fn slot_if_typed<T: Component>(&self) -> Option<usize> {
        let schema = &self.record.schema;
        schema
            .slot_of(T::ID)
            .filter(|_| schema.contains::<T>())
    }

    fn missing<T: Component>(&self) -> StoreError {
        StoreError::ComponentNotFound {
            entity: self.id(),
            component: T::NAME,
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&'static str> = match self.record.slots.try_borrow() {
            Ok(slots) => slots
                .iter()
                .enumerate()
                .filter(|(_, value)| value.is_some())
                .filter_map(|(slot, _)| self.record.schema.name_of(self.record.schema.id_at(slot)))
                .collect(),
            Err(_) => Vec::new(),
        };
        f.debug_struct("Entity")
            .field("id", &self.id())
            .field("components", &names)
            .field("alive", &self.is_alive())
            .finish()
    }
}
