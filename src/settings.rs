//! Player settings and preferences
//!
//! Stored as JSON next to the binary. Missing fields fall back to defaults so
//! older files keep loading.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest and highest accepted tilt sensitivity
pub const SENSITIVITY_RANGE: (f64, f64) = (0.1, 3.0);

/// Maze difficulty (sets the starting cell size)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "medium" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Cell size of the first level, in pixels
    pub fn base_cell_size(&self) -> u32 {
        match self {
            Difficulty::Easy => 100,
            Difficulty::Normal => 80,
            Difficulty::Hard => 60,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Player preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tilt sensitivity multiplier
    pub sensitivity: f64,

    // === Accelerometer orientation ===
    /// Mirror the X axis
    pub invert_x: bool,
    /// Mirror the Y axis
    pub invert_y: bool,
    /// Swap X and Y before inverting (board mounted sideways)
    pub swap_xy: bool,

    // === Game ===
    pub difficulty: Difficulty,
    pub player_name: String,
    pub player_two_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,

            invert_x: true,
            invert_y: true,
            swap_xy: false,

            difficulty: Difficulty::Normal,
            player_name: "Player".to_string(),
            player_two_name: "Player 2".to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from JSON, clamping out-of-range values
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.set_sensitivity(settings.sensitivity);
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from `path`, using defaults if missing or unreadable
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path)
            .map_err(SettingsError::from)
            .and_then(|json| Self::from_json(&json))
        {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save settings to `path`
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        fs::write(path, self.to_json()?)?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Set sensitivity, clamped to the accepted range
    pub fn set_sensitivity(&mut self, value: f64) {
        let (lo, hi) = SENSITIVITY_RANGE;
        self.sensitivity = if value.is_finite() {
            value.clamp(lo, hi)
        } else {
            1.0
        };
    }

    /// Name for a player slot (0 = first player)
    pub fn player_name(&self, slot: usize) -> &str {
        match slot {
            0 => &self.player_name,
            _ => &self.player_two_name,
        }
    }
}
