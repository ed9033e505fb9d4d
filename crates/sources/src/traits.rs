//! Capability traits for external collaborators.
//!
//! The pipeline depends only on these traits, never on a concrete
//! platform. Adding a platform means implementing `LikedTracksClient`
//! and teaching a `ClientFactory` to build it.

use crate::error::Result;
use crate::types::{Credentials, LikedPage, RawTrack, RemotePlaylist, RemoteTrack};
use async_trait::async_trait;
use tracks::Platform;

/// A credential-bearing client for one platform's "liked tracks" endpoint.
///
/// ## Design Note
/// - `Send + Sync` so clients can be fetched concurrently from spawned tasks
/// - Pagination is driven by the caller through `cursor`; `None` requests
///   the first page
#[async_trait]
pub trait LikedTracksClient: Send + Sync {
    /// Which platform this client talks to
    fn platform(&self) -> Platform;

    /// Fetch one page of liked tracks.
    ///
    /// # Arguments
    /// * `limit` - Maximum number of tracks wanted on this page
    /// * `cursor` - Continuation token from the previous page, if any
    async fn fetch_liked_tracks(&self, limit: usize, cursor: Option<&str>) -> Result<LikedPage>;
}

/// The recommendation source: top tracks for a tag.
#[async_trait]
pub trait TagSource: Send + Sync {
    async fn fetch_tracks_for_tag(&self, tag: &str, limit: usize) -> Result<Vec<RawTrack>>;
}

/// Builds liked-tracks clients from configured credentials.
///
/// Fails with `SourceError::Configuration` when required fields are absent.
pub trait ClientFactory: Send + Sync {
    fn build(
        &self,
        platform: Platform,
        credentials: &Credentials,
    ) -> Result<Box<dyn LikedTracksClient>>;
}

/// A platform that can receive playlists (search, create, append).
///
/// ## Design Note
/// - Writes need a token with write scope; read-only tokens fail with
///   `SourceError::Authentication`, which callers treat as "discovery only"
#[async_trait]
pub trait PlaylistTarget: Send + Sync {
    fn platform(&self) -> Platform;

    /// Free-text track search, best upstream matches first
    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<RemoteTrack>>;

    /// The user's playlist with exactly this title, if any
    async fn find_playlist(&self, title: &str) -> Result<Option<RemotePlaylist>>;

    async fn create_playlist(&self, title: &str, description: &str) -> Result<RemotePlaylist>;

    /// Append tracks, skipping ids already on the playlist.
    /// Returns how many were actually added.
    async fn add_tracks(&self, playlist_id: u64, track_ids: &[u64]) -> Result<usize>;
}
