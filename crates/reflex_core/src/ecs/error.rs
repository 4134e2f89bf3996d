use crate::ecs::{ComponentId, EntityId};
use thiserror::Error;

/// Errors surfaced by store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("entity {id} not found")]
    EntityNotFound { id: EntityId },

    #[error("entity {entity} has no component '{component}'")]
    ComponentNotFound {
        entity: EntityId,
        component: &'static str,
    },

    #[error("expected exactly one entity matching [{requirements}], found {found}")]
    Cardinality { requirements: String, found: usize },
}

/// Errors that can occur while freezing a component schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("component id {id} is declared by both '{first}' and '{second}'")]
    DuplicateId {
        id: ComponentId,
        first: &'static str,
        second: &'static str,
    },

    #[error("component name '{name}' is declared more than once")]
    DuplicateName { name: &'static str },
}
