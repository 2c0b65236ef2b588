//! Simulation settings
//!
//! Loaded from a JSON file next to the scenario; every field has a default
//! so partial files are accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_TICKS_PER_SECOND;
use crate::error::{SimError, SimResult};

/// Which maps the simulation steps each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StepPolicy {
    /// Only maps with at least one player sprite on them
    #[default]
    Occupied,
    /// Every map with an attached dispatcher
    All,
}

impl StepPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepPolicy::Occupied => "Occupied",
            StepPolicy::All => "All",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "occupied" => Some(StepPolicy::Occupied),
            "all" => Some(StepPolicy::All),
            _ => None,
        }
    }
}

/// Simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fixed simulation rate; speeds are given in pixels per second
    pub ticks_per_second: u32,
    /// When false, sprites of type "player" skip location checks entirely
    pub player_move_check: bool,
    /// Which maps get stepped
    pub step_policy: StepPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            player_move_check: true,
            step_policy: StepPolicy::Occupied,
        }
    }
}

impl Settings {
    /// Convert a speed in pixels/second into pixels/tick
    #[inline]
    pub fn per_tick(&self, per_second: f32) -> f32 {
        per_second / self.ticks_per_second.max(1) as f32
    }

    /// Length of one tick in seconds
    #[inline]
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.ticks_per_second.max(1) as f32
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&json)?;
        log::info!(
            "Loaded settings from {} ({} ticks/s, policy {})",
            path.display(),
            settings.ticks_per_second,
            settings.step_policy.as_str()
        );
        Ok(settings)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> SimResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}
