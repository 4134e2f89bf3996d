// component.rs - Component identity and per-store schema
//
// Components are identified by u32 IDs declared next to their Rust type.
// A store is built around a fixed Schema listing every component it may
// hold; the schema also decides each component's slot in an entity.

use crate::ecs::SchemaError;
use rustc_hash::FxHashSet;
use std::any::TypeId;

pub type ComponentId = u32;

/// Metadata describing one component of a schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentMeta {
    pub id: ComponentId,
    pub name: &'static str,
    pub type_id: TypeId,
}

/// Trait for Rust-defined components.
///
/// The store never interprets component values; the trait only ties a
/// value type to a stable id and a human-readable name.
pub trait Component: 'static + Sized {
    /// Unique component ID within a schema.
    const ID: ComponentId;

    /// Human-readable name, used in requirement keys and errors.
    const NAME: &'static str;

    /// Metadata for schema registration.
    fn meta() -> ComponentMeta {
        ComponentMeta {
            id: Self::ID,
            name: Self::NAME,
            type_id: TypeId::of::<Self>(),
        }
    }
}

/// Helper macro to implement the `Component` trait.
///
/// # Example
/// ```ignore
/// struct Position { x: f32, y: f32 }
///
/// define_component!(Position, 1, "position");
/// ```
#[macro_export]
macro_rules! define_component {
    ($ty:ty, $id:expr, $name:expr) => {
        impl $crate::ecs::Component for $ty {
            const ID: $crate::ecs::ComponentId = $id;
            const NAME: &'static str = $name;
        }
    };
}

/// The fixed component set of one store.
///
/// Metas are kept sorted by id, so iterating slots in order yields the
/// canonical (sorted) component order used for archetype keys.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    metas: Vec<ComponentMeta>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    /// Slot index of a component inside every entity of this schema.
    pub fn slot_of(&self, id: ComponentId) -> Option<usize> {
        self.metas.binary_search_by_key(&id, |meta| meta.id).ok()
    }

    pub fn meta(&self, id: ComponentId) -> Option<&ComponentMeta> {
        self.slot_of(id).map(|slot| &self.metas[slot])
    }

    pub fn name_of(&self, id: ComponentId) -> Option<&'static str> {
        self.meta(id).map(|meta| meta.name)
    }

    /// Whether `T` is registered under its id with the matching Rust type.
    pub fn contains<T: Component>(&self) -> bool {
        self.meta(T::ID)
            .is_some_and(|meta| meta.type_id == TypeId::of::<T>())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentMeta> {
        self.metas.iter()
    }

    #[inline]
    pub(crate) fn id_at(&self, slot: usize) -> ComponentId {
        self.metas[slot].id
    }

    /// Resolve the slot for a typed component, panicking on schema misuse.
    ///
    /// # Panics
    /// If the component is not part of this schema, or was registered
    /// under the same id with a different Rust type.
    pub(crate) fn expect_slot(&self, id: ComponentId, type_id: TypeId, name: &'static str) -> usize {
        match self.slot_of(id) {
            Some(slot) if self.metas[slot].type_id == type_id => slot,
            Some(slot) => panic!(
                "component '{}' (id {}) conflicts with schema component '{}'",
                name, id, self.metas[slot].name
            ),
            None => panic!(
                "component '{}' (id {}) is not part of this store's schema",
                name, id
            ),
        }
    }
}

/// Builder collecting component types before the schema is frozen.
#[derive(Default)]
pub struct SchemaBuilder {
    metas: Vec<ComponentMeta>,
}

impl SchemaBuilder {
    /// Register a Rust-typed component.
    pub fn with<T: Component>(mut self) -> Self {
        self.metas.push(T::meta());
        self
    }

    /// Register a component from raw metadata.
    pub fn with_meta(mut self, meta: ComponentMeta) -> Self {
        self.metas.push(meta);
        self
    }

    /// Freeze the schema, rejecting conflicting ids or names.
    ///
    /// Registering the same type twice is allowed and collapses to one entry.
    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut metas = self.metas;
        metas.sort_by_key(|meta| meta.id);
        metas.dedup();

        for pair in metas.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(SchemaError::DuplicateId {
                    id: pair[0].id,
                    first: pair[0].name,
                    second: pair[1].name,
                });
            }
        }

        let mut names = FxHashSet::default();
        for meta in &metas {
            if !names.insert(meta.name) {
                return Err(SchemaError::DuplicateName { name: meta.name });
            }
        }

        Ok(Schema { metas })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position;
    define_component!(Position, 3, "position");

    struct Velocity;
    define_component!(Velocity, 1, "velocity");

    struct Impostor;
    define_component!(Impostor, 3, "impostor");

    struct Twin;
    define_component!(Twin, 7, "velocity");

    #[test]
    fn slots_follow_component_id_order() {
        let schema = Schema::builder()
            .with::<Position>()
            .with::<Velocity>()
            .build()
            .unwrap();

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.slot_of(Velocity::ID), Some(0));
        assert_eq!(schema.slot_of(Position::ID), Some(1));
        assert_eq!(schema.slot_of(42), None);
        assert_eq!(schema.name_of(3), Some("position"));
        assert!(schema.contains::<Position>());
        assert!(!schema.contains::<Impostor>());
    }

    #[test]
    fn registering_a_type_twice_is_harmless() {
        let schema = Schema::builder()
            .with::<Position>()
            .with::<Position>()
            .build()
            .unwrap();
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn conflicting_ids_are_rejected() {
        let err = Schema::builder()
            .with::<Position>()
            .with::<Impostor>()
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateId { id: 3, .. }));
    }

    #[test]
    fn conflicting_names_are_rejected() {
        let err = Schema::builder()
            .with::<Velocity>()
            .with::<Twin>()
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateName { name: "velocity" });
    }

    #[test]
    #[should_panic(expected = "not part of this store's schema")]
    fn unknown_component_slot_panics() {
        let schema = Schema::builder().with::<Velocity>().build().unwrap();
        schema.expect_slot(Position::ID, TypeId::of::<Position>(), Position::NAME);
    }
}
