//! Store settings

use serde::{Deserialize, Serialize};

/// Tuning knobs for an [`EntityStore`](crate::ecs::EntityStore).
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Drop a listener batch as soon as its last subscriber unsubscribes.
    pub retire_idle_batches: bool,
    /// Forget archetypes that hold no entities and no batches.
    pub prune_empty_archetypes: bool,
    /// Initial capacity of the entity table.
    pub entity_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retire_idle_batches: true,
            prune_empty_archetypes: false,
            entity_capacity: 1024,
        }
    }
}
