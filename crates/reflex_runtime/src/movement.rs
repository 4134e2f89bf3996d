//! Integrates velocity into position.

use crate::components::{Transform, Velocity};
use reflex_core::ecs::{EntityStore, StoreError, View};
use reflex_core::requirements;

pub struct Movement {
    moving: View,
}

impl Movement {
    pub fn new(store: &EntityStore) -> Self {
        Self {
            moving: store.multiple(&requirements![Transform, Velocity]),
        }
    }

    /// Advance every moving entity by `dt`. Returns how many moved.
    pub fn tick(&self, dt: f32) -> Result<usize, StoreError> {
        let mut moved = 0;
        for entity in self.moving.iter() {
            let velocity = entity.get::<Velocity>()?.0;
            entity.get_mut::<Transform>()?.position += velocity * dt;
            moved += 1;
        }
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::schema;
    use glam::Vec2;
    use reflex_core::spawn;

    #[test]
    fn only_entities_with_velocity_move() {
        let store = EntityStore::new(schema().unwrap());
        let still = spawn!(store, Transform { position: Vec2::ZERO, rotation: 0.0 });
        let mover = spawn!(
            store,
            Transform { position: Vec2::ZERO, rotation: 0.0 },
            Velocity(Vec2::new(2.0, 0.0))
        );

        let movement = Movement::new(&store);
        assert_eq!(movement.tick(0.5).unwrap(), 1);
        assert_eq!(mover.get::<Transform>().unwrap().position, Vec2::new(1.0, 0.0));
        assert_eq!(still.get::<Transform>().unwrap().position, Vec2::ZERO);

        still.set(Velocity(Vec2::Y));
        assert_eq!(movement.tick(1.0).unwrap(), 2);
        assert_eq!(still.get::<Transform>().unwrap().position, Vec2::Y);
    }
}
