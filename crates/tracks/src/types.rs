//! Core domain types shared by every crate in the workspace.
//!
//! Key Rust concepts demonstrated here:
//! - Private fields + getters to make a struct immutable after construction
//! - Validating constructors returning `Result`
//! - Enums with serde renames for stable wire names

use crate::error::{Result, TrackError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Platform
// =============================================================================

/// Where a track record came from.
///
/// Used for provenance and statistics only; it never takes part in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Tag-based recommendation source (candidates)
    LastFm,
    SoundCloud,
    Spotify,
}

impl Platform {
    /// All platforms, in declaration order
    pub const ALL: [Platform; 3] = [Platform::LastFm, Platform::SoundCloud, Platform::Spotify];

    /// Stable lowercase identifier, identical to the serde name
    pub fn id(&self) -> &'static str {
        match self {
            Platform::LastFm => "lastfm",
            Platform::SoundCloud => "soundcloud",
            Platform::Spotify => "spotify",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::LastFm => "Last.fm",
            Platform::SoundCloud => "SoundCloud",
            Platform::Spotify => "Spotify",
        };
        f.write_str(name)
    }
}

impl FromStr for Platform {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lastfm" | "last.fm" => Ok(Platform::LastFm),
            "soundcloud" => Ok(Platform::SoundCloud),
            "spotify" => Ok(Platform::Spotify),
            _ => Err(TrackError::UnknownPlatform(s.to_string())),
        }
    }
}

// =============================================================================
// Track
// =============================================================================

/// A music track, either a candidate or a favorite.
///
/// Fields are private: once built, a `Track` never changes. Comparison keys
/// are derived separately by the pipeline and never written back here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    artist: String,
    title: String,
    /// Source-specific identifier such as a permalink URL. Informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    source_id: Option<String>,
    platform_origin: Platform,
}

impl Track {
    /// Build a track, rejecting empty artist or title.
    ///
    /// The strings are trimmed but otherwise stored as given; display
    /// formatting stays faithful to the source.
    pub fn new(
        artist: impl Into<String>,
        title: impl Into<String>,
        platform_origin: Platform,
    ) -> Result<Self> {
        let artist = artist.into().trim().to_string();
        let title = title.into().trim().to_string();

        if artist.is_empty() {
            return Err(TrackError::EmptyArtist { title });
        }
        if title.is_empty() {
            return Err(TrackError::EmptyTitle { artist });
        }

        Ok(Self {
            artist,
            title,
            source_id: None,
            platform_origin,
        })
    }

    /// Attach a source-specific identifier (builder pattern).
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        let source_id = source_id.into();
        self.source_id = if source_id.trim().is_empty() {
            None
        } else {
            Some(source_id)
        };
        self
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    pub fn platform_origin(&self) -> Platform {
        self.platform_origin
    }

    /// Case-insensitive artist + title equality.
    ///
    /// This is plain identity, not the fuzzy matching done by the pipeline.
    pub fn same_identity(&self, other: &Track) -> bool {
        self.artist.to_lowercase() == other.artist.to_lowercase()
            && self.title.to_lowercase() == other.title.to_lowercase()
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)
    }
}
