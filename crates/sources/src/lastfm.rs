//! Last.fm tag search, the recommendation source for candidates.
//!
//! `tag.gettoptracks` returns `tracks.track` as an array, or as a single
//! object when only one track exists. Errors come back as HTTP 200 with
//! an `error` code in the body.

use crate::error::{Result, SourceError};
use crate::http::{check_status, transport_error};
use crate::traits::TagSource;
use crate::types::RawTrack;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};
use tracks::Platform;

pub const DEFAULT_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// Last.fm error codes we treat specially
const INVALID_API_KEY: i64 = 10;
const SUSPENDED_API_KEY: i64 = 26;
const OPERATION_FAILED: i64 = 8;
const SERVICE_OFFLINE: i64 = 11;
const TEMPORARILY_UNAVAILABLE: i64 = 16;
const RATE_LIMIT_EXCEEDED: i64 = 29;

fn text_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("#text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// Parse a `tag.gettoptracks` body.
pub(crate) fn parse_top_tracks(body: &Value) -> Result<Vec<RawTrack>> {
    let platform = Platform::LastFm;

    if let Some(code) = body.get("error").and_then(Value::as_i64) {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let reason = format!("error {}: {}", code, message);
        return Err(match code {
            INVALID_API_KEY | SUSPENDED_API_KEY => SourceError::authentication(platform, reason),
            OPERATION_FAILED | SERVICE_OFFLINE | TEMPORARILY_UNAVAILABLE | RATE_LIMIT_EXCEEDED => {
                SourceError::transient(platform, reason)
            }
            _ => SourceError::invalid_response(platform, reason),
        });
    }

    let entries = match body.get("tracks").and_then(|t| t.get("track")) {
        Some(Value::Array(items)) => items.iter().collect::<Vec<_>>(),
        Some(single @ Value::Object(_)) => vec![single],
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            return Err(SourceError::invalid_response(
                platform,
                "`tracks.track` is neither a list nor an object",
            ));
        }
    };

    let tracks = entries
        .into_iter()
        .map(|entry| {
            let name = entry.get("name").map(text_field).unwrap_or_default();
            let artist = entry.get("artist").map(text_field).unwrap_or_default();
            let raw = RawTrack::new(artist, name);
            match entry.get("url").and_then(Value::as_str) {
                Some(url) => raw.with_source_id(url),
                None => raw,
            }
        })
        .collect();

    Ok(tracks)
}

/// Last.fm API client
#[derive(Clone)]
pub struct LastFmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LastFmClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TagSource for LastFmClient {
    #[instrument(skip(self))]
    async fn fetch_tracks_for_tag(&self, tag: &str, limit: usize) -> Result<Vec<RawTrack>> {
        let platform = Platform::LastFm;
        let limit = limit.max(1).to_string();

        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("method", "tag.gettoptracks"),
                ("tag", tag),
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(platform, e))?;
        check_status(platform, response.status())?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| transport_error(platform, e))?;
        let tracks = parse_top_tracks(&body)?;

        debug!("Fetched {} tracks for tag '{}'", tracks.len(), tag);
        Ok(tracks)
    }
}
