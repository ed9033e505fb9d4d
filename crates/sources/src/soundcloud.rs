//! SoundCloud liked-tracks client (API v2).
//!
//! `/me/likes` returns a heterogeneous `collection`: some entries are
//! tracks, others are wrappers (`{"kind": "like", "track": {...}}`), and
//! playlists can be liked too. Only tracks are kept.
//!
//! The same client is a `PlaylistTarget`: `/search/tracks` for lookups,
//! `/me/playlists` and `/playlists` for find, create and append. Writes
//! need a token with write scope.

use crate::error::{Result, SourceError};
use crate::http::{check_status, transport_error};
use crate::traits::{LikedTracksClient, PlaylistTarget};
use crate::types::{LikedPage, RawTrack, RemotePlaylist, RemoteTrack};
use async_trait::async_trait;
use reqwest::RequestBuilder;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashSet;
use tracing::{debug, info, instrument};
use tracks::Platform;

pub const DEFAULT_BASE_URL: &str = "https://api-v2.soundcloud.com";

/// Upstream page size cap
const MAX_PAGE_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
struct LikesResponse {
    #[serde(default)]
    collection: Vec<Value>,
    next_href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    collection: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SoundCloudTrack {
    id: Option<u64>,
    kind: Option<String>,
    duration: Option<u64>,
    title: Option<String>,
    permalink_url: Option<String>,
    user: Option<SoundCloudUser>,
    publisher_metadata: Option<PublisherMetadata>,
}

#[derive(Debug, Deserialize)]
struct SoundCloudPlaylist {
    id: u64,
    #[serde(default)]
    title: String,
    permalink_url: Option<String>,
    /// Entries can be stubs (`{"id": 1}`) or null for removed tracks
    #[serde(default)]
    tracks: Vec<Value>,
}

impl From<SoundCloudPlaylist> for RemotePlaylist {
    fn from(playlist: SoundCloudPlaylist) -> Self {
        Self {
            id: playlist.id,
            title: playlist.title,
            permalink_url: playlist.permalink_url,
            track_ids: playlist
                .tracks
                .iter()
                .filter_map(|track| track.get("id").and_then(Value::as_u64))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SoundCloudUser {
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PublisherMetadata {
    artist: Option<String>,
}

impl SoundCloudTrack {
    /// The uploader's username is a weak artist signal; the label-supplied
    /// publisher artist wins when present.
    fn artist(&self) -> String {
        self.publisher_metadata
            .as_ref()
            .and_then(|m| m.artist.as_deref())
            .filter(|a| !a.trim().is_empty())
            .or_else(|| self.user.as_ref().and_then(|u| u.username.as_deref()))
            .unwrap_or_default()
            .to_string()
    }
}

/// Parse one `/me/likes` page into raw tracks.
pub(crate) fn parse_likes_page(body: Value) -> std::result::Result<LikedPage, String> {
    let response: LikesResponse =
        serde_json::from_value(body).map_err(|e| format!("unexpected likes payload: {}", e))?;

    let mut tracks = Vec::with_capacity(response.collection.len());
    for item in response.collection {
        let track_value = match item.get("track").filter(|inner| !inner.is_null()) {
            Some(inner) => inner.clone(),
            None => item,
        };

        let Ok(track) = serde_json::from_value::<SoundCloudTrack>(track_value) else {
            debug!("Skipping unparseable SoundCloud like");
            continue;
        };
        if track.kind.as_deref().is_some_and(|kind| kind != "track") {
            continue;
        }

        let artist = track.artist();
        let mut raw = RawTrack::new(artist, track.title.unwrap_or_default());
        if let Some(url) = track.permalink_url {
            raw = raw.with_source_id(url);
        }
        tracks.push(raw);
    }

    Ok(LikedPage {
        tracks,
        next_cursor: response.next_href.filter(|href| !href.is_empty()),
    })
}

/// Parse a `/search/tracks` body. Entries without an id can't be added to
/// a playlist and are dropped.
pub(crate) fn parse_search_results(body: Value) -> std::result::Result<Vec<RemoteTrack>, String> {
    let response: SearchResponse =
        serde_json::from_value(body).map_err(|e| format!("unexpected search payload: {}", e))?;

    Ok(response
        .collection
        .into_iter()
        .filter_map(|item| serde_json::from_value::<SoundCloudTrack>(item).ok())
        .filter(|track| track.kind.as_deref().is_none_or(|kind| kind == "track"))
        .filter_map(|track| {
            let id = track.id?;
            let artist = track.artist();
            Some(RemoteTrack {
                id,
                title: track.title.unwrap_or_default(),
                artist,
                permalink_url: track.permalink_url,
                duration_ms: track.duration,
            })
        })
        .collect())
}

pub(crate) fn parse_playlist(body: Value) -> std::result::Result<RemotePlaylist, String> {
    serde_json::from_value::<SoundCloudPlaylist>(body)
        .map(RemotePlaylist::from)
        .map_err(|e| format!("unexpected playlist payload: {}", e))
}

/// `/me/playlists` answers with a bare array or a `collection` wrapper
/// depending on `linked_partitioning`.
pub(crate) fn parse_playlists(body: Value) -> std::result::Result<Vec<RemotePlaylist>, String> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("collection") {
            Some(Value::Array(items)) => items,
            _ => return Err("playlist listing has no collection".to_string()),
        },
        _ => return Err("unexpected playlist listing payload".to_string()),
    };

    items.into_iter().map(parse_playlist).collect()
}

/// Existing ids followed by new ones, without duplicates.
/// Returns the merged list and how many ids were new.
fn merge_track_ids(existing: &[u64], new: &[u64]) -> (Vec<u64>, usize) {
    let mut seen: HashSet<u64> = existing.iter().copied().collect();
    let mut merged = existing.to_vec();

    for id in new {
        if seen.insert(*id) {
            merged.push(*id);
        }
    }

    let added = merged.len() - existing.len();
    (merged, added)
}

/// Client for a single SoundCloud account, authenticated with an OAuth token.
pub struct SoundCloudClient {
    http: reqwest::Client,
    base_url: String,
    oauth_token: String,
}

impl SoundCloudClient {
    pub fn new(http: reqwest::Client, oauth_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            oauth_token: oauth_token.into(),
        }
    }

    /// Override the API root (builder pattern)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Authenticate, send, check the status and decode the JSON body
    async fn send_json(&self, request: RequestBuilder) -> Result<Value> {
        let platform = Platform::SoundCloud;
        let response = request
            .header(AUTHORIZATION, format!("OAuth {}", self.oauth_token))
            .header(ACCEPT, "application/json; charset=utf-8")
            .send()
            .await
            .map_err(|e| transport_error(platform, e))?;
        check_status(platform, response.status())?;

        response.json().await.map_err(|e| transport_error(platform, e))
    }
}

#[async_trait]
impl LikedTracksClient for SoundCloudClient {
    fn platform(&self) -> Platform {
        Platform::SoundCloud
    }

    #[instrument(skip(self, cursor), fields(platform = "soundcloud"))]
    async fn fetch_liked_tracks(&self, limit: usize, cursor: Option<&str>) -> Result<LikedPage> {
        let platform = Platform::SoundCloud;
        let request = match cursor {
            Some(next_href) => self.http.get(next_href),
            None => {
                let limit = limit.clamp(1, MAX_PAGE_SIZE).to_string();
                self.http
                    .get(self.url("/me/likes"))
                    .query(&[("limit", limit.as_str()), ("linked_partitioning", "1")])
            }
        };

        let body = self.send_json(request).await?;
        let page = parse_likes_page(body)
            .map_err(|reason| SourceError::invalid_response(platform, reason))?;

        debug!(
            "Fetched {} SoundCloud likes (more: {})",
            page.tracks.len(),
            page.next_cursor.is_some()
        );
        Ok(page)
    }
}

#[async_trait]
impl PlaylistTarget for SoundCloudClient {
    fn platform(&self) -> Platform {
        Platform::SoundCloud
    }

    #[instrument(skip(self), fields(platform = "soundcloud"))]
    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<RemoteTrack>> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE).to_string();
        let request = self.http.get(self.url("/search/tracks")).query(&[
            ("q", query),
            ("limit", limit.as_str()),
            ("linked_partitioning", "1"),
        ]);

        let body = self.send_json(request).await?;
        parse_search_results(body).map_err(|reason| SourceError::invalid_response(Platform::SoundCloud, reason))
    }

    #[instrument(skip(self), fields(platform = "soundcloud"))]
    async fn find_playlist(&self, title: &str) -> Result<Option<RemotePlaylist>> {
        let body = self.send_json(self.http.get(self.url("/me/playlists"))).await?;
        let playlists =
            parse_playlists(body).map_err(|reason| SourceError::invalid_response(Platform::SoundCloud, reason))?;

        Ok(playlists.into_iter().find(|playlist| playlist.title == title))
    }

    #[instrument(skip(self, description), fields(platform = "soundcloud"))]
    async fn create_playlist(&self, title: &str, description: &str) -> Result<RemotePlaylist> {
        let payload = json!({
            "playlist": {
                "title": title,
                "sharing": "public",
                "description": description,
            }
        });

        let body = self
            .send_json(self.http.post(self.url("/playlists")).json(&payload))
            .await?;
        let playlist =
            parse_playlist(body).map_err(|reason| SourceError::invalid_response(Platform::SoundCloud, reason))?;

        info!("Created SoundCloud playlist '{}' (id {})", playlist.title, playlist.id);
        Ok(playlist)
    }

    #[instrument(skip(self, track_ids), fields(platform = "soundcloud", count = track_ids.len()))]
    async fn add_tracks(&self, playlist_id: u64, track_ids: &[u64]) -> Result<usize> {
        let path = format!("/playlists/{}", playlist_id);
        let body = self.send_json(self.http.get(self.url(&path))).await?;
        let current =
            parse_playlist(body).map_err(|reason| SourceError::invalid_response(Platform::SoundCloud, reason))?;

        let (merged, added) = merge_track_ids(&current.track_ids, track_ids);
        if added == 0 {
            debug!("Playlist {} already contains every track", playlist_id);
            return Ok(0);
        }

        let tracks: Vec<Value> = merged.iter().map(|id| json!({ "id": id })).collect();
        let payload = json!({ "playlist": { "tracks": tracks } });
        self.send_json(self.http.put(self.url(&path)).json(&payload)).await?;

        info!("Added {} tracks to SoundCloud playlist {}", added, playlist_id);
        Ok(added)
    }
}
