//! Filtering configuration.
//!
//! Passed into the engine per call; nothing here is read from the
//! environment or held globally. The CLI layer builds these from TOML.

use crate::matcher::{DEFAULT_ARTIST_THRESHOLD, DEFAULT_TITLE_THRESHOLD, Matcher};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use sources::Credentials;
use std::time::Duration;
use tracks::Platform;

fn default_true() -> bool {
    true
}

/// One platform the user wants to filter against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub platform: Platform,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub credentials: Credentials,
}

impl PlatformConfig {
    pub fn new(platform: Platform, credentials: Credentials) -> Self {
        Self {
            platform,
            enabled: true,
            credentials,
        }
    }

    pub fn disabled(platform: Platform) -> Self {
        Self {
            platform,
            enabled: false,
            credentials: Credentials::default(),
        }
    }
}

/// Tuning knobs shared by every platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub artist_threshold: f64,
    pub title_threshold: f64,
    /// Upper bound on liked tracks pulled per platform
    pub max_favorites: usize,
    pub page_size: usize,
    /// Per-request timeout
    pub fetch_timeout_secs: u64,
    pub retry: RetryPolicy,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            artist_threshold: DEFAULT_ARTIST_THRESHOLD,
            title_threshold: DEFAULT_TITLE_THRESHOLD,
            max_favorites: 500,
            page_size: 50,
            fetch_timeout_secs: 30,
            retry: RetryPolicy::default(),
        }
    }
}

impl FilterSettings {
    pub fn matcher(&self) -> Matcher {
        Matcher::new(self.artist_threshold, self.title_threshold)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Everything `FilterEngine::filter_tracks` needs besides the candidates.
///
/// Platform order matters: it decides attribution when a candidate is
/// liked on more than one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Master switch; when false no platform is consulted
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub platforms: Vec<PlatformConfig>,
    #[serde(default)]
    pub tuning: FilterSettings,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            platforms: Vec::new(),
            tuning: FilterSettings::default(),
        }
    }
}

impl FilterConfig {
    /// Builder-style: append a platform
    pub fn with_platform(mut self, platform: PlatformConfig) -> Self {
        self.platforms.push(platform);
        self
    }

    pub fn with_tuning(mut self, tuning: FilterSettings) -> Self {
        self.tuning = tuning;
        self
    }

    /// Platforms to consult, in configuration order
    pub fn enabled_platforms(&self) -> impl Iterator<Item = &PlatformConfig> {
        self.platforms
            .iter()
            .filter(move |p| self.enabled && p.enabled)
    }

    pub fn has_enabled_platforms(&self) -> bool {
        self.enabled_platforms().next().is_some()
    }
}
