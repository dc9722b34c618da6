//! Engine configuration.
//!
//! All timing is expressed in pulses. The defaults reproduce a ten pulse per
//! second clock with a 75 second in-game hour.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

const fn default_pulses_per_second() -> u32 {
    10
}

const fn default_seconds_per_hour() -> u32 {
    75
}

const fn default_violence_seconds() -> u32 {
    2
}

const fn default_targeting_k() -> i32 {
    10
}

const fn default_max_pets() -> usize {
    8
}

const fn default_burning_duration() -> i32 {
    2
}

const fn default_rage_seconds() -> u32 {
    4
}

const fn default_true() -> bool {
    true
}

/// Tunables for an [`crate::engine::Engine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pulses in one real second.
    #[serde(default = "default_pulses_per_second")]
    pub pulses_per_second: u32,
    /// Real seconds in one in-game hour. An hour is one effect tick.
    #[serde(default = "default_seconds_per_hour")]
    pub seconds_per_mud_hour: u32,
    /// Seconds between combat rounds.
    #[serde(default = "default_violence_seconds")]
    pub violence_seconds: u32,
    /// Seed for the engine's random stream.
    #[serde(default)]
    pub seed: u64,
    /// Targeting sample bound: a mobile samples `max(1, int * K / 100)` candidates.
    #[serde(default = "default_targeting_k")]
    pub targeting_k: i32,
    /// Most pets a character may control.
    #[serde(default = "default_max_pets")]
    pub max_pets: usize,
    /// Ticks a character burns after catching fire.
    #[serde(default = "default_burning_duration")]
    pub burning_duration: i32,
    /// Seconds between rage updates.
    #[serde(default = "default_rage_seconds")]
    pub rage_seconds: u32,
    /// Whether players may attack players outside arenas.
    #[serde(default)]
    pub pk_allowed: bool,
    /// Whether area spells may hit players in non-arena rooms.
    #[serde(default = "default_true")]
    pub room_effects_allowed: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pulses_per_second: default_pulses_per_second(),
            seconds_per_mud_hour: default_seconds_per_hour(),
            violence_seconds: default_violence_seconds(),
            seed: 0,
            targeting_k: default_targeting_k(),
            max_pets: default_max_pets(),
            burning_duration: default_burning_duration(),
            rage_seconds: default_rage_seconds(),
            pk_allowed: false,
            room_effects_allowed: true,
        }
    }
}

impl EngineConfig {
    /// Parse from a RON string.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] on malformed input.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| GameError::DataParseError {
            path: "<string>".into(),
            message: e.to_string(),
        })
    }

    /// Load from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        ron::from_str(&contents).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Pulses per in-game hour; one effect sweep happens every this many pulses.
    #[must_use]
    pub fn pulses_per_hour(&self) -> u64 {
        (u64::from(self.pulses_per_second) * u64::from(self.seconds_per_mud_hour)).max(1)
    }

    /// Pulses per combat round.
    #[must_use]
    pub fn violence_pulses(&self) -> u64 {
        (u64::from(self.pulses_per_second) * u64::from(self.violence_seconds)).max(1)
    }

    /// Convert seconds to pulses.
    #[must_use]
    pub fn seconds(&self, seconds: u32) -> u64 {
        u64::from(self.pulses_per_second) * u64::from(seconds)
    }

    /// Problems with the values, empty when usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.pulses_per_second == 0 {
            errors.push("pulses_per_second must be positive".to_string());
        }
        if self.seconds_per_mud_hour == 0 {
            errors.push("seconds_per_mud_hour must be positive".to_string());
        }
        if self.targeting_k <= 0 {
            errors.push(format!("targeting_k must be positive, got {}", self.targeting_k));
        }
        if self.burning_duration < 0 {
            errors.push(format!(
                "burning_duration must not be negative, got {}",
                self.burning_duration
            ));
        }
        errors
    }
}
