//! Error types for the tracks crate.
//!
//! These errors are precondition violations: a caller handed us data that
//! cannot describe a track. They are not network or platform conditions,
//! so they are reported immediately instead of being absorbed.

use thiserror::Error;

/// Errors that can occur while constructing domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// Artist was empty or whitespace-only
    #[error("Artist name cannot be empty (title: {title:?})")]
    EmptyArtist { title: String },

    /// Title was empty or whitespace-only
    #[error("Track title cannot be empty (artist: {artist:?})")]
    EmptyTitle { artist: String },

    /// A platform name didn't match any known platform
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, TrackError>;
