//! Error types for the effect engine.
//!
//! Gameplay outcomes (fizzles, evasions, resisted effects) are never errors;
//! routines report those through [`crate::flags::CastResult`]. This type only
//! covers loading, validation, and API misuse.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the engine.
#[derive(Debug, Error)]
pub enum GameError {
    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Spell catalog failed validation.
    #[error("Spell catalog is invalid: {}", .0.join("; "))]
    CatalogInvalid(Vec<String>),

    /// A spell id that is not in the catalog.
    #[error("Unknown spell ID: {0}")]
    UnknownSpell(u16),

    /// A spell name that is not in the catalog.
    #[error("Unknown spell name: {0}")]
    UnknownSpellName(String),

    /// Character handle does not resolve.
    #[error("Character not found: {0}")]
    CharacterNotFound(u32),

    /// Object handle does not resolve.
    #[error("Object not found: {0}")]
    ObjectNotFound(u32),

    /// Room handle does not resolve.
    #[error("Room not found: {0}")]
    RoomNotFound(u32),

    /// An effect that declares neither a location nor any flags.
    #[error("Invalid effect for spell {spell}: {reason}")]
    InvalidEffect {
        /// Spell the effect belongs to.
        spell: u16,
        /// Why it was rejected.
        reason: String,
    },

    /// Invalid engine state (snapshot encode/decode failures).
    #[error("Invalid engine state: {0}")]
    InvalidState(String),
}
