//! # MUD Server Host
//!
//! Headless host for the effect engine.
//!
//! Loads the spell catalog and engine tunables, then drives
//! [`mud_core::engine::Engine::pulse`] on a real-time interval and turns
//! engine messages into log lines.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod runner;
pub mod sink;

pub use config::ServerConfig;
pub use runner::{GameLoop, LoopStatus};
pub use sink::TracingSink;

use thiserror::Error;

/// Result type alias using [`ServerError`].
pub type Result<T> = std::result::Result<T, ServerError>;

/// Host start-up failures.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Engine data failed to load.
    #[error(transparent)]
    Game(#[from] mud_core::error::GameError),

    /// The server config file could not be read or parsed.
    #[error("Failed to load server config '{path}': {message}")]
    Config {
        /// Path to the file.
        path: String,
        /// What went wrong.
        message: String,
    },
}
