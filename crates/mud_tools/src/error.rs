//! Tool error type.

use thiserror::Error;

use mud_core::error::GameError;

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;

/// Everything a tool command can fail with.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Engine-side load or validation failure.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The data directory is missing a required file.
    #[error("Missing data file: {0}")]
    MissingFile(String),

    /// No spell matches the requested name or id.
    #[error("No spell matches '{0}'")]
    NoSuchSpell(String),

    /// A class name that does not parse.
    #[error("Unknown class '{0}'")]
    UnknownClass(String),

    /// JSON output failed.
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// RON output failed.
    #[error("Failed to encode RON: {0}")]
    Ron(#[from] ron::Error),
}
