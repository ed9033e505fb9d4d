//! Data shapes exchanged with external platforms.

use crate::error::{Result, SourceError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracks::{Platform, Track};

/// A track as reported by an upstream API, before validation.
///
/// Any field may be empty; `into_track` decides whether it is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTrack {
    pub artist: String,
    pub title: String,
    pub source_id: Option<String>,
}

impl RawTrack {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            source_id: None,
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Validate into a `Track` tagged with `platform`.
    pub fn into_track(self, platform: Platform) -> tracks::Result<Track> {
        let track = Track::new(self.artist, self.title, platform)?;
        Ok(match self.source_id {
            Some(id) => track.with_source_id(id),
            None => track,
        })
    }
}

/// One page of a user's liked tracks.
#[derive(Debug, Clone, Default)]
pub struct LikedPage {
    pub tracks: Vec<RawTrack>,
    /// Opaque continuation token (usually the upstream's "next" URL)
    pub next_cursor: Option<String>,
}

/// Opaque credential fields for one platform, e.g. `oauth_token`.
///
/// `Debug` prints field names only so tokens never end up in logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(BTreeMap<String, String>);

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Fetch a required, non-blank field or fail with a configuration error.
    pub fn require(&self, platform: Platform, key: &str) -> Result<&str> {
        match self.get(key).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(SourceError::configuration(
                platform,
                format!("missing credential field `{}`", key),
            )),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// A track hosted on a platform we can write playlists to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteTrack {
    pub id: u64,
    pub title: String,
    /// Uploader or publisher name
    pub artist: String,
    pub permalink_url: Option<String>,
    pub duration_ms: Option<u64>,
}

/// A playlist owned by the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemotePlaylist {
    pub id: u64,
    pub title: String,
    pub permalink_url: Option<String>,
    /// Tracks already on the playlist, in playlist order
    pub track_ids: Vec<u64>,
}
