//! Server configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Result, ServerError};

/// How the host runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Wall-clock milliseconds between pulses.
    pub tick_interval_ms: u64,
    /// Directory holding the data files.
    pub data_dir: PathBuf,
    /// Spell catalog file, relative to `data_dir`.
    pub spells_file: String,
    /// Engine tunables file, relative to `data_dir`.
    pub engine_file: String,
    /// Stop after this many pulses.
    pub pulse_limit: Option<u64>,
    /// Log a status line every this many pulses; 0 disables it.
    pub status_every: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            data_dir: PathBuf::from("assets/data"),
            spells_file: "spells.ron".into(),
            engine_file: "engine.ron".into(),
            pulse_limit: None,
            status_every: 600,
        }
    }
}

impl ServerConfig {
    /// Parse from a RON string.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] on malformed input.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| ServerError::Config {
            path: "<string>".into(),
            message: e.to_string(),
        })
    }

    /// Load from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ServerError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        ron::from_str(&text).map_err(|e| ServerError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Full path of the spell catalog.
    #[must_use]
    pub fn spells_path(&self) -> PathBuf {
        self.data_dir.join(&self.spells_file)
    }

    /// Full path of the engine tunables.
    #[must_use]
    pub fn engine_path(&self) -> PathBuf {
        self.data_dir.join(&self.engine_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_takes_defaults() {
        let config = ServerConfig::from_ron_str("(tick_interval_ms: 50, pulse_limit: Some(10))").unwrap();
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.pulse_limit, Some(10));
        assert_eq!(config.spells_path(), PathBuf::from("assets/data/spells.ron"));
    }

    #[test]
    fn test_bad_ron_is_reported() {
        assert!(matches!(
            ServerConfig::from_ron_str("(tick_interval_ms: \"fast\")"),
            Err(ServerError::Config { .. })
        ));
        assert!(ServerConfig::load("/no/such/server.ron").is_err());
    }
}
