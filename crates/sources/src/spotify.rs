//! Spotify saved-tracks client (`/v1/me/tracks`).

use crate::error::Result;
use crate::http::{check_status, transport_error};
use crate::traits::LikedTracksClient;
use crate::types::{LikedPage, RawTrack};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use tracks::Platform;

pub const DEFAULT_BASE_URL: &str = "https://api.spotify.com/v1";

/// Spotify rejects `limit` above 50
const MAX_PAGE_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
struct SavedTracksResponse {
    #[serde(default)]
    items: Vec<SavedTrackItem>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SavedTrackItem {
    /// Null for unavailable or local files
    track: Option<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    name: Option<String>,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

/// Parse one saved-tracks page. The first listed artist is the primary one.
fn parse_saved_tracks_page(response: SavedTracksResponse) -> LikedPage {
    let tracks = response
        .items
        .into_iter()
        .filter_map(|item| item.track)
        .map(|track| {
            let artist = track
                .artists
                .into_iter()
                .find_map(|a| a.name)
                .unwrap_or_default();
            let raw = RawTrack::new(artist, track.name.unwrap_or_default());
            match track.external_urls.and_then(|urls| urls.spotify) {
                Some(url) => raw.with_source_id(url),
                None => raw,
            }
        })
        .collect();

    LikedPage {
        tracks,
        next_cursor: response.next.filter(|next| !next.is_empty()),
    }
}

/// Client for a single Spotify account, authenticated with a bearer token.
pub struct SpotifyClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl SpotifyClient {
    pub fn new(http: reqwest::Client, access_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: access_token.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LikedTracksClient for SpotifyClient {
    fn platform(&self) -> Platform {
        Platform::Spotify
    }

    #[instrument(skip(self, cursor), fields(platform = "spotify"))]
    async fn fetch_liked_tracks(&self, limit: usize, cursor: Option<&str>) -> Result<LikedPage> {
        let platform = self.platform();
        let request = match cursor {
            Some(next) => self.http.get(next),
            None => {
                let limit = limit.clamp(1, MAX_PAGE_SIZE).to_string();
                self.http
                    .get(format!("{}/me/tracks", self.base_url))
                    .query(&[("limit", limit.as_str()), ("offset", "0")])
            }
        };

        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| transport_error(platform, e))?;
        check_status(platform, response.status())?;

        let body: SavedTracksResponse = response
            .json()
            .await
            .map_err(|e| transport_error(platform, e))?;
        let page = parse_saved_tracks_page(body);

        debug!("Fetched {} Spotify saved tracks", page.tracks.len());
        Ok(page)
    }
}
