use crate::ecs::{Component, ComponentId, Schema};
use std::any::{Any, TypeId};
use std::fmt;

/// One type-erased component value waiting to be placed in an entity.
struct PendingComponent {
    id: ComponentId,
    name: &'static str,
    type_id: TypeId,
    value: Box<dyn Any>,
}

/// Builder collecting an entity's initial components before creation.
#[derive(Default)]
pub struct EntityBuilder {
    components: Vec<PendingComponent>,
}

impl EntityBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Add a component by value. A second value of the same type replaces the first.
    pub fn with<T: Component>(mut self, value: T) -> Self {
        let pending = PendingComponent {
            id: T::ID,
            name: T::NAME,
            type_id: TypeId::of::<T>(),
            value: Box::new(value),
        };
        match self.components.iter_mut().find(|c| c.id == T::ID) {
            Some(existing) => *existing = pending,
            None => self.components.push(pending),
        }
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.iter().map(|c| c.id)
    }

    /// Lay the values out in schema slot order.
    ///
    /// # Panics
    /// If a component is not part of the schema.
    pub(crate) fn into_slots(self, schema: &Schema) -> Vec<Option<Box<dyn Any>>> {
        let mut slots: Vec<Option<Box<dyn Any>>> = Vec::with_capacity(schema.len());
        slots.resize_with(schema.len(), || None);
        for pending in self.components {
            let slot = schema.expect_slot(pending.id, pending.type_id, pending.name);
            slots[slot] = Some(pending.value);
        }
        slots
    }
}

impl fmt::Debug for EntityBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.components.iter().map(|c| c.name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Health(u32);
    crate::define_component!(Health, 2, "health");

    #[derive(Debug, PartialEq)]
    struct Name(&'static str);
    crate::define_component!(Name, 1, "name");

    #[test]
    fn later_values_replace_earlier_ones() {
        let builder = EntityBuilder::new().with(Health(1)).with(Health(5));
        assert_eq!(builder.len(), 1);
        assert_eq!(builder.component_ids().collect::<Vec<_>>(), vec![Health::ID]);
    }

    #[test]
    fn slots_follow_schema_order() {
        let schema = Schema::builder()
            .with::<Health>()
            .with::<Name>()
            .build()
            .unwrap();
        let slots = EntityBuilder::new()
            .with(Health(7))
            .with(Name("ada"))
            .into_slots(&schema);

        assert_eq!(slots.len(), 2);
        let name = slots[0].as_ref().unwrap().downcast_ref::<Name>();
        let health = slots[1].as_ref().unwrap().downcast_ref::<Health>();
        assert_eq!(name, Some(&Name("ada")));
        assert_eq!(health, Some(&Health(7)));
    }

    #[test]
    #[should_panic(expected = "'health'")]
    fn unknown_components_panic_with_their_name() {
        let schema = Schema::builder().with::<Name>().build().unwrap();
        EntityBuilder::new().with(Health(1)).into_slots(&schema);
    }
}
