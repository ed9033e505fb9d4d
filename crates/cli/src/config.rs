//! Application configuration: a TOML file plus environment overrides.
//!
//! ```toml
//! default_tags = ["electronic", "shoegaze"]
//! num_tracks = 30
//!
//! [lastfm]
//! api_key = "..."
//!
//! [filtering]
//! enabled = true
//!
//! [[filtering.platforms]]
//! platform = "soundcloud"
//! credentials = { oauth_token = "..." }
//!
//! [filtering.tuning]
//! artist_threshold = 0.85
//!
//! [import]
//! playlist_title = "songs-enjoyer - Discovery"
//! ```

use anyhow::{Context, Result};
use pipeline::FilterConfig;
use serde::{Deserialize, Serialize};
use sources::factory::{SOUNDCLOUD_TOKEN_FIELD, SPOTIFY_TOKEN_FIELD};
use std::path::Path;
use tracing::{info, warn};
use tracks::Platform;

pub const LASTFM_API_KEY_VAR: &str = "LASTFM_API_KEY";
pub const SOUNDCLOUD_TOKEN_VAR: &str = "SOUNDCLOUD_OAUTH_TOKEN";
pub const SPOTIFY_TOKEN_VAR: &str = "SPOTIFY_ACCESS_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastFmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub limit_per_tag: usize,
}

impl Default for LastFmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            limit_per_tag: discovery::orchestrator::DEFAULT_LIMIT_PER_TAG,
        }
    }
}

/// Where `import` writes the playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub playlist_title: String,
    /// Needs write scope; falls back to the SoundCloud filtering token
    pub oauth_token: Option<String>,
    pub base_url: Option<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            playlist_title: discovery::DEFAULT_PLAYLIST_TITLE.to_string(),
            oauth_token: None,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_tags: Vec<String>,
    pub num_tracks: usize,
    pub lastfm: LastFmConfig,
    pub filtering: FilterConfig,
    pub import: ImportConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_tags: vec!["electronic".to_string()],
            num_tracks: 30,
            lastfm: LastFmConfig::default(),
            filtering: FilterConfig::default(),
            import: ImportConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file is absent,
    /// then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config = Self::from_toml_str(&text)
                .with_context(|| format!("Invalid config file {}", path.display()))?;
            info!("Loaded configuration from {}", path.display());
            config
        } else {
            warn!("Config file {} not found, using defaults", path.display());
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Fill secrets from `lookup` (the process environment in production).
    ///
    /// Tokens only land on platforms already listed in the config; an
    /// environment variable alone never enables filtering.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_blank(LASTFM_API_KEY_VAR) {
            self.lastfm.api_key = Some(key);
        }

        let tokens = [
            (Platform::SoundCloud, SOUNDCLOUD_TOKEN_VAR, SOUNDCLOUD_TOKEN_FIELD),
            (Platform::Spotify, SPOTIFY_TOKEN_VAR, SPOTIFY_TOKEN_FIELD),
        ];

        if let Some(token) = non_blank(SOUNDCLOUD_TOKEN_VAR) {
            self.import.oauth_token = Some(token);
        }

        for (platform, var, field) in tokens {
            if let Some(token) = non_blank(var) {
                for entry in self
                    .filtering
                    .platforms
                    .iter_mut()
                    .filter(|entry| entry.platform == platform)
                {
                    entry.credentials.insert(field, token.clone());
                }
            }
        }
    }

    /// SoundCloud token for playlist import: the `[import]` one, else the
    /// first SoundCloud filtering entry that has one.
    pub fn import_token(&self) -> Option<&str> {
        self.import.oauth_token.as_deref().or_else(|| {
            self.filtering
                .platforms
                .iter()
                .filter(|entry| entry.platform == Platform::SoundCloud)
                .find_map(|entry| entry.credentials.get(SOUNDCLOUD_TOKEN_FIELD))
        })
    }
}
