//! Runtime settings

use anyhow::{Context, Result};
use reflex_core::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Simulation settings, read from an optional JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub ticks: u32,
    /// Seconds per tick.
    pub dt: f32,
    /// Rocket acceleration while thrusting.
    pub thrust: f32,
    pub drifters: usize,
    pub store: StoreConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            ticks: 180,
            dt: 1.0 / 60.0,
            thrust: 4.0,
            drifters: 8,
            store: StoreConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_gives_defaults() {
        let config = RuntimeConfig::load(None).unwrap();
        assert_eq!(config.ticks, 180);
        assert!(config.store.retire_idle_batches);
    }

    #[test]
    fn nested_store_settings_parse() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{ "ticks": 10, "store": { "prune_empty_archetypes": true } }"#)
                .unwrap();
        assert_eq!(config.ticks, 10);
        assert_eq!(config.drifters, 8);
        assert!(config.store.prune_empty_archetypes);
    }

    #[test]
    fn unreadable_file_names_the_path() {
        let err = RuntimeConfig::load(Some(Path::new("/nonexistent/reflex.json"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/reflex.json"));
    }
}
