//! Player rocket control.

use crate::components::{Rocket, Transform, Velocity};
use glam::Vec2;
use reflex_core::ecs::{EntityStore, Single, StoreError};
use reflex_core::requirements;

pub struct RocketControl {
    rocket: Single,
    thrust: f32,
}

impl RocketControl {
    pub fn new(store: &EntityStore, thrust: f32) -> Self {
        Self {
            rocket: store.single(&requirements![Rocket, Transform]),
            thrust,
        }
    }

    pub fn set_thrust(&self, on: bool) -> Result<(), StoreError> {
        let rocket = self.rocket.get()?;
        rocket.get_mut::<Rocket>()?.thrusting = on;
        Ok(())
    }

    /// Accelerate along the heading while thrusting and the rocket can move.
    pub fn tick(&self, dt: f32) -> Result<(), StoreError> {
        let rocket = self.rocket.get()?;
        let heading = Vec2::from_angle(rocket.get::<Transform>()?.rotation);
        let thrusting = {
            let mut state = rocket.get_mut::<Rocket>()?;
            state.frames_since_death += 1;
            state.thrusting
        };
        if thrusting && rocket.has::<Velocity>() {
            rocket.get_mut::<Velocity>()?.0 += heading * self.thrust * dt;
        }
        Ok(())
    }
}
