//! Data-driven game balance
//!
//! Every field has a default, so partial JSON files are valid.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Balance values consumed by the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Surviving this long wins the run (seconds)
    pub run_goal_secs: f32,
    /// Base player move speed (px/s)
    pub player_speed: f32,
    /// Base critical hit chance (0-1)
    pub crit_chance: f32,

    // === Director ===
    /// Spawn budget per second before difficulty
    pub spawn_base: f32,
    /// Spawn budget per second per point of difficulty
    pub spawn_per_difficulty: f32,
    /// Seconds of play per point of difficulty
    pub difficulty_period: f32,
    /// Distance outside the visible half extents where enemies appear
    pub spawn_padding: f32,
    /// First chest time (seconds)
    pub chest_first_secs: f32,
    /// Range of the random delay between chests (seconds)
    pub chest_interval: (f32, f32),
    /// First elite time (seconds)
    pub elite_first_secs: f32,
    /// Fixed gap between elites (seconds)
    pub elite_interval: f32,
    /// Absolute boss checkpoints (seconds)
    pub boss_checkpoints: Vec<f32>,
    /// Spawns are skipped while this many enemies are alive
    pub max_enemies: usize,

    // === Progression ===
    /// Upgrade candidates shown per offer
    pub offer_size: usize,

    /// View half extents used until the host reports its own
    pub default_half_extents: Vec2,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            run_goal_secs: 600.0,
            player_speed: 165.0,
            crit_chance: 0.05,

            spawn_base: 2.0,
            spawn_per_difficulty: 1.25,
            difficulty_period: 75.0,
            spawn_padding: 70.0,
            chest_first_secs: 60.0,
            chest_interval: (50.0, 80.0),
            elite_first_secs: 45.0,
            elite_interval: 45.0,
            boss_checkpoints: vec![120.0, 240.0, 360.0, 480.0],
            max_enemies: 400,

            offer_size: 3,

            default_half_extents: Vec2::new(640.0, 360.0),
        }
    }
}

impl Tuning {
    /// Load tuning from a JSON file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning from {}", path.display());
                    tuning
                }
                Err(e) => {
                    log::warn!("Invalid tuning file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Using default tuning");
                Self::default()
            }
        }
    }
}
