//! # MUD Development Tools
//!
//! Command-line tools for development:
//! - Spell catalog and engine config validation
//! - Spell listing and inspection
//! - Seeded duel runs for reproducing fights

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod duel;
pub mod error;
pub mod inspect;
pub mod validate;

pub use error::{Result, ToolError};
