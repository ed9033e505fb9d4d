//! Builds HTTP-backed liked-tracks clients from configured credentials.

use crate::error::{Result, SourceError};
use crate::soundcloud::{self, SoundCloudClient};
use crate::spotify::{self, SpotifyClient};
use crate::traits::{ClientFactory, LikedTracksClient};
use crate::types::Credentials;
use std::time::Duration;
use tracks::Platform;

/// Credential field consumed by the SoundCloud client
pub const SOUNDCLOUD_TOKEN_FIELD: &str = "oauth_token";

/// Credential field consumed by the Spotify client
pub const SPOTIFY_TOKEN_FIELD: &str = "access_token";

/// `ClientFactory` backed by one shared `reqwest::Client`.
///
/// ## Design Note
/// `reqwest::Client` is an `Arc` internally, so cloning it into every
/// platform client shares the connection pool.
#[derive(Clone)]
pub struct HttpClientFactory {
    http: reqwest::Client,
    soundcloud_base_url: String,
    spotify_base_url: String,
}

impl HttpClientFactory {
    /// Create a factory whose requests time out after `request_timeout`.
    pub fn new(request_timeout: Duration) -> std::result::Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("songs-enjoyer/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_http(http))
    }

    /// Wrap an existing client
    pub fn with_http(http: reqwest::Client) -> Self {
        Self {
            http,
            soundcloud_base_url: soundcloud::DEFAULT_BASE_URL.to_string(),
            spotify_base_url: spotify::DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_soundcloud_base_url(mut self, url: impl Into<String>) -> Self {
        self.soundcloud_base_url = url.into();
        self
    }

    pub fn with_spotify_base_url(mut self, url: impl Into<String>) -> Self {
        self.spotify_base_url = url.into();
        self
    }

    /// The shared HTTP client, for building other sources (e.g. Last.fm)
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

impl ClientFactory for HttpClientFactory {
    fn build(
        &self,
        platform: Platform,
        credentials: &Credentials,
    ) -> Result<Box<dyn LikedTracksClient>> {
        match platform {
            Platform::SoundCloud => {
                let token = credentials.require(platform, SOUNDCLOUD_TOKEN_FIELD)?;
                Ok(Box::new(
                    SoundCloudClient::new(self.http.clone(), token)
                        .with_base_url(self.soundcloud_base_url.as_str()),
                ))
            }
            Platform::Spotify => {
                let token = credentials.require(platform, SPOTIFY_TOKEN_FIELD)?;
                Ok(Box::new(
                    SpotifyClient::new(self.http.clone(), token)
                        .with_base_url(self.spotify_base_url.as_str()),
                ))
            }
            Platform::LastFm => Err(SourceError::configuration(
                platform,
                "Last.fm does not expose a liked-tracks endpoint",
            )),
        }
    }
}
