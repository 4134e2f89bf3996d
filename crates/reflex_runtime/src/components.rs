//! Components of the demo simulation

use glam::Vec2;
use reflex_core::define_component;
use reflex_core::ecs::{Schema, SchemaError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    /// Heading in radians.
    pub rotation: f32,
}

define_component!(Transform, 1, "transform");

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vec2);

define_component!(Velocity, 2, "velocity");

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rocket {
    pub thrusting: bool,
    pub collisions: u32,
    pub frames_since_death: u32,
}

define_component!(Rocket, 3, "rocket");

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelGoal {
    pub radius: f32,
}

define_component!(LevelGoal, 4, "level_goal");

/// Marker for bodies that reached the goal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Captured;

define_component!(Captured, 5, "captured");

pub fn schema() -> Result<Schema, SchemaError> {
    Schema::builder()
        .with::<Transform>()
        .with::<Velocity>()
        .with::<Rocket>()
        .with::<LevelGoal>()
        .with::<Captured>()
        .build()
}
