//! Tunable gameplay parameters.
//!
//! Loaded from `game_config.json` with support for an environment variable
//! override. Values are fixed for the lifetime of a session.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use bevy::prelude::Resource;
use serde::Deserialize;
use thiserror::Error;

use crate::coords::{CellGrid, LatLng};
use crate::field::{CacheSpawner, DeterministicField};
use crate::interaction::InteractionRules;

pub const BUILTIN_GAME_CONFIG: &str = include_str!("data/game_config.json");
pub const GAME_CONFIG_ENV: &str = "GEOCACHE_CONFIG_PATH";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Anchor of the cell lattice; cell (0,0) has this as its south-west corner.
    pub origin: LatLng,
    /// Where the player spawns. Falls back to `origin`.
    pub start_position: Option<LatLng>,
    pub tile_degrees: f64,
    /// Distance covered by one manual step. Falls back to `tile_degrees`.
    pub step_degrees: Option<f64>,
    pub neighborhood_size: u32,
    pub cache_spawn_probability: f64,
    /// Interaction reach in cell units (strictly less than).
    pub interaction_range: f64,
    pub score_goal: u32,
    pub world_seed: u64,
    pub zoom: u8,
    pub viewport_follows_player: bool,
    pub inventory_key: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            origin: LatLng::new(36.997936938057016, -122.05703507501151),
            start_position: None,
            tile_degrees: 1e-4,
            step_degrees: None,
            neighborhood_size: 25,
            cache_spawn_probability: 0.1,
            interaction_range: 3.0,
            score_goal: 32,
            world_seed: 16,
            zoom: 19,
            viewport_follows_player: true,
            inventory_key: "playerInventory".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GameConfigError {
    #[error("failed to parse game config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read game config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid game config: {0}")]
    Invalid(String),
}

impl GameConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_GAME_CONFIG).expect("builtin game config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, GameConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, GameConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| GameConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        GameConfig::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), GameConfigError> {
        if !(self.tile_degrees.is_finite() && self.tile_degrees > 0.0) {
            return Err(GameConfigError::Invalid(format!(
                "tile_degrees must be positive, got {}",
                self.tile_degrees
            )));
        }
        if let Some(step) = self.step_degrees {
            if !(step.is_finite() && step > 0.0) {
                return Err(GameConfigError::Invalid(format!(
                    "step_degrees must be positive, got {step}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.cache_spawn_probability) {
            return Err(GameConfigError::Invalid(format!(
                "cache_spawn_probability must lie in [0, 1], got {}",
                self.cache_spawn_probability
            )));
        }
        if !(self.interaction_range.is_finite() && self.interaction_range > 0.0) {
            return Err(GameConfigError::Invalid(format!(
                "interaction_range must be positive, got {}",
                self.interaction_range
            )));
        }
        if self.neighborhood_size == 0 {
            return Err(GameConfigError::Invalid(
                "neighborhood_size must be at least 1".to_string(),
            ));
        }
        if !self.score_goal.is_power_of_two() {
            return Err(GameConfigError::Invalid(format!(
                "score_goal must be a power of two, got {}",
                self.score_goal
            )));
        }
        if self.inventory_key.is_empty() {
            return Err(GameConfigError::Invalid(
                "inventory_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn start_position(&self) -> LatLng {
        self.start_position.unwrap_or(self.origin)
    }

    pub fn step_degrees(&self) -> f64 {
        self.step_degrees.unwrap_or(self.tile_degrees)
    }

    pub fn cell_grid(&self) -> CellGrid {
        CellGrid::new(self.origin, self.tile_degrees)
    }

    pub fn spawner(&self) -> CacheSpawner {
        CacheSpawner::new(
            DeterministicField::new(self.world_seed),
            self.cache_spawn_probability,
        )
    }

    pub fn interaction_rules(&self) -> InteractionRules {
        InteractionRules {
            range: self.interaction_range,
            score_goal: self.score_goal,
        }
    }
}

/// Handle for accessing the game configuration.
#[derive(Resource, Debug, Clone)]
pub struct GameConfigHandle(pub Arc<GameConfig>);

impl GameConfigHandle {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self(config)
    }

    pub fn get(&self) -> Arc<GameConfig> {
        Arc::clone(&self.0)
    }
}

/// Metadata about where the active configuration came from.
#[derive(Resource, Debug, Clone, Default)]
pub struct GameConfigMetadata {
    path: Option<PathBuf>,
}

impl GameConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Load the game configuration from `GEOCACHE_CONFIG_PATH`, falling back to the
/// builtin file when the variable is unset or the file cannot be used.
pub fn load_game_config_from_env() -> (Arc<GameConfig>, GameConfigMetadata) {
    if let Some(path) = env::var(GAME_CONFIG_ENV).ok().map(PathBuf::from) {
        match GameConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "geocache::config",
                    path = %path.display(),
                    "game_config.loaded=file"
                );
                return (Arc::new(config), GameConfigMetadata::new(Some(path)));
            }
            Err(err) => {
                tracing::warn!(
                    target: "geocache::config",
                    path = %path.display(),
                    error = %err,
                    "game_config.load_failed"
                );
            }
        }
    }

    let config = GameConfig::builtin();
    tracing::info!(target: "geocache::config", "game_config.loaded=builtin");
    (config, GameConfigMetadata::new(None))
}
