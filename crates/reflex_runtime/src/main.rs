//! Reflex Runtime
//!
//! Small simulation driving the reactive store: one rocket, a field of
//! drifting bodies and a goal that captures whatever reaches it.

mod components;
mod config;
mod level;
mod movement;
mod rocket;

use anyhow::Result;
use components::{LevelGoal, Rocket, Transform, Velocity};
use config::RuntimeConfig;
use glam::Vec2;
use level::Level;
use movement::Movement;
use reflex_core::ecs::{Entity, EntityStore};
use reflex_core::{requirements, spawn};
use rocket::RocketControl;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const GOAL: Vec2 = Vec2::new(10.0, 0.0);

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Reflex v{}", reflex_core::VERSION);

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = RuntimeConfig::load(config_path.as_deref())?;
    info!(ticks = config.ticks, drifters = config.drifters, "configuration loaded");

    let store = EntityStore::with_config(components::schema()?, config.store.clone());

    let velocity_log = store.listen(
        &requirements![Velocity],
        |entity: &Entity| debug!(entity = %entity.id(), "started moving"),
        |entity: &Entity| debug!(entity = %entity.id(), "stopped moving"),
    );

    populate(&store, &config);

    let movement = Movement::new(&store);
    let rocket = RocketControl::new(&store, config.thrust);
    let level = Level::new(&store);
    rocket.set_thrust(true)?;

    let mut captured = 0;
    for tick in 0..config.ticks {
        let moved = movement.tick(config.dt)?;
        rocket.tick(config.dt)?;
        let newly = level.tick()?;
        if !newly.is_empty() {
            captured += newly.len();
            info!(tick, moved, captured = newly.len(), "goal reached");
        }
    }

    let pilot = store.single(&requirements![Rocket]).get()?;
    let state = *pilot.get::<Rocket>()?;
    info!(
        entities = store.len(),
        archetypes = store.archetype_count(),
        captured,
        rocket_frames = state.frames_since_death,
        rocket_collisions = state.collisions,
        "simulation finished"
    );

    if reflex_metrics::ENABLED {
        for (name, value) in store.metrics() {
            info!(metric = name, value, "store metric");
        }
    }

    velocity_log.unsubscribe();
    Ok(())
}

fn populate(store: &EntityStore, config: &RuntimeConfig) {
    spawn!(
        store,
        Transform { position: Vec2::ZERO, rotation: 0.0 },
        Velocity(Vec2::ZERO),
        Rocket::default()
    );
    spawn!(
        store,
        Transform { position: GOAL, rotation: 0.0 },
        LevelGoal { radius: 1.5 }
    );

    for i in 0..config.drifters {
        let position = Vec2::new(i as f32 * 2.0 - 5.0, 6.0);
        let speed = 2.0 + i as f32 * 0.25;
        let heading = (GOAL - position).normalize_or_zero();
        spawn!(
            store,
            Transform { position, rotation: heading.to_angle() },
            Velocity(heading * speed)
        );
    }
    debug!(entities = store.len(), "level populated");
}
