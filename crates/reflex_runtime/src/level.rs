//! Goal capture rules.

use crate::components::{Captured, LevelGoal, Transform, Velocity};
use reflex_core::ecs::{ChangeTracker, Entity, EntityId, EntityStore, Single, StoreError, View};
use reflex_core::requirements;
use tracing::info;

pub struct Level {
    goal: Single,
    candidates: View,
    captured: ChangeTracker,
}

impl Level {
    pub fn new(store: &EntityStore) -> Self {
        Self {
            goal: store.single(&requirements![LevelGoal, Transform]),
            candidates: store.multiple(&requirements![Transform, Velocity, !Captured]),
            captured: store.changing(&requirements![Captured]),
        }
    }

    /// Capture every moving body inside the goal radius.
    ///
    /// Returns the ids captured since the previous tick.
    pub fn tick(&self) -> Result<Vec<EntityId>, StoreError> {
        let goal = self.goal.get()?;
        let center = goal.get::<Transform>()?.position;
        let radius = goal.get::<LevelGoal>()?.radius;

        for entity in self.candidates.to_vec() {
            let inside = entity.get::<Transform>()?.position.distance(center) <= radius;
            if inside {
                entity.set(Captured);
                entity.delete::<Velocity>();
            }
        }

        let change = self.captured.poll();
        for entity in &change.added {
            info!(entity = %entity.id(), "body captured");
        }
        Ok(change.added.iter().map(Entity::id).collect())
    }
}
