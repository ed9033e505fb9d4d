//! # Playlist Import
//!
//! Pushes a generated playlist to a streaming platform:
//! 1. Look every track up with a ladder of search queries
//! 2. Pick the best search hit by weighted title/artist similarity
//! 3. Find the playlist by title, or create it
//! 4. Append the found tracks, skipping ids already present
//!
//! Steps 3 and 4 need write access. When they fail the import degrades to
//! a discovery-only report: the found tracks and their links, with the
//! failure recorded as a warning.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use pipeline::matcher::similarity;
use sources::{PlaylistTarget, RemotePlaylist, RemoteTrack, SourceError};
use tracks::{Platform, Track};

/// Title used when none is configured
pub const DEFAULT_PLAYLIST_TITLE: &str = "songs-enjoyer - Discovery";

/// Results requested per search query
const SEARCH_LIMIT: usize = 5;

/// Best hit must score above this to count as found
const MIN_MATCH_SCORE: f64 = 0.3;

/// Queries of this length or shorter match too much to be useful
const MIN_QUERY_LEN: usize = 3;

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*(?:\([^)]*\)|\[[^\]]*\])\s*").unwrap());

static REMASTER_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*-\s*remaster.*$").unwrap());

static YEAR_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*-\s*\d{4}.*$").unwrap());

static FEATURING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\(?\s*\b(?:feat\.?|featuring|ft\.?|with)\s+[^)]*\)?").unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// What an import achieved
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub platform: Platform,
    /// The playlist written to; `None` for a discovery-only import
    pub playlist: Option<RemotePlaylist>,
    /// Search hits, in playlist order, one per remote track
    pub found: Vec<RemoteTrack>,
    /// "artist - title" of tracks with no acceptable hit
    pub not_found: Vec<String>,
    /// Tracks newly appended to the playlist
    pub added: usize,
    /// Playlist access failures that made the import discovery-only
    pub warnings: Vec<String>,
}

impl ImportReport {
    /// True when the tracks landed in a playlist
    pub fn is_complete(&self) -> bool {
        self.playlist.is_some()
    }

    /// Up to `limit` links to found tracks
    pub fn sample_links(&self, limit: usize) -> Vec<&str> {
        self.found
            .iter()
            .filter_map(|track| track.permalink_url.as_deref())
            .take(limit)
            .collect()
    }
}

/// Imports playlists into one `PlaylistTarget`
#[derive(Clone)]
pub struct PlaylistImporter {
    target: Arc<dyn PlaylistTarget>,
}

impl PlaylistImporter {
    pub fn new(target: Arc<dyn PlaylistTarget>) -> Self {
        Self { target }
    }

    /// Search every track, then write the hits to the playlist `title`.
    ///
    /// Fails when `tracks` is empty, when nothing was found, or when the
    /// platform rejects the token during search. Playlist write failures
    /// are reported, not returned.
    #[instrument(skip(self, tracks, description), fields(platform = %self.target.platform(), count = tracks.len()))]
    pub async fn import(&self, tracks: &[Track], title: &str, description: &str) -> Result<ImportReport> {
        let platform = self.target.platform();
        if tracks.is_empty() {
            bail!("No tracks to import");
        }

        let mut found: Vec<RemoteTrack> = Vec::new();
        let mut seen_ids = HashSet::new();
        let mut not_found = Vec::new();

        for track in tracks {
            match self.search_track(track).await? {
                Some(hit) => {
                    debug!("Found '{}' by {} (id {})", hit.title, hit.artist, hit.id);
                    if seen_ids.insert(hit.id) {
                        found.push(hit);
                    }
                }
                None => not_found.push(format!("{} - {}", track.artist(), track.title())),
            }
        }

        info!("Found {} tracks on {}, {} not found", found.len(), platform, not_found.len());
        if found.is_empty() {
            bail!("No tracks found on {} ({} searched)", platform, tracks.len());
        }

        let mut report = ImportReport {
            platform,
            playlist: None,
            found,
            not_found,
            added: 0,
            warnings: Vec::new(),
        };

        match self.write_playlist(&report.found, title, description).await {
            Ok((playlist, added)) => {
                report.playlist = Some(playlist);
                report.added = added;
            }
            Err(err) => {
                warn!("Playlist update failed, keeping discovery results: {}", err);
                report.warnings.push(err.to_string());
            }
        }

        Ok(report)
    }

    /// Try each query in turn; the first acceptable hit wins.
    ///
    /// A failed query moves on to the next one, except for rejected
    /// credentials, which would fail every query the same way.
    async fn search_track(&self, track: &Track) -> Result<Option<RemoteTrack>> {
        for query in search_queries(track) {
            match self.target.search_tracks(&query, SEARCH_LIMIT).await {
                Ok(results) => {
                    if let Some(hit) = best_match(track, &results) {
                        return Ok(Some(hit.clone()));
                    }
                }
                Err(err) if err.is_authentication() => return Err(anyhow!(err)),
                Err(err) => debug!("Search query '{}' failed: {}", query, err),
            }
        }

        Ok(None)
    }

    async fn write_playlist(
        &self,
        found: &[RemoteTrack],
        title: &str,
        description: &str,
    ) -> Result<(RemotePlaylist, usize), SourceError> {
        let playlist = match self.target.find_playlist(title).await? {
            Some(existing) => existing,
            None => self.target.create_playlist(title, description).await?,
        };

        let ids: Vec<u64> = found.iter().map(|track| track.id).collect();
        let added = self.target.add_tracks(playlist.id, &ids).await?;
        Ok((playlist, added))
    }
}

/// Strip bracketed qualifiers and remaster/year suffixes
pub fn clean_search_term(term: &str) -> String {
    let term = BRACKETED.replace_all(term, " ");
    let term = REMASTER_SUFFIX.replace(&term, "");
    let term = YEAR_SUFFIX.replace(&term, "");
    WHITESPACE.replace_all(&term, " ").trim().to_string()
}

fn remove_features(title: &str) -> String {
    FEATURING.replace_all(title, "").trim().to_string()
}

/// Search queries for `track`, most specific first, without duplicates
pub fn search_queries(track: &Track) -> Vec<String> {
    let artist = clean_search_term(track.artist());
    let title = clean_search_term(track.title());
    let first_word = title.split_whitespace().next().unwrap_or(&title);
    let bare_title = remove_features(&title);

    let candidates = [
        format!("{} {}", artist, title),
        format!("\"{}\" \"{}\"", artist, title),
        format!("{} {}", title, artist),
        title.clone(),
        format!("{} {}", artist, first_word),
        format!("{} {}", artist, bare_title),
        bare_title.clone(),
    ];

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|query| query.trim().to_string())
        .filter(|query| query.chars().count() >= MIN_QUERY_LEN)
        .filter(|query| seen.insert(query.clone()))
        .collect()
}

/// Weighted similarity of a search hit to the wanted track.
///
/// Title counts 0.7 and artist 0.3, plus 0.2 when one artist name contains
/// the other and 0.1 when one title contains the other.
pub fn match_score(track: &Track, hit: &RemoteTrack) -> f64 {
    let artist = track.artist().to_lowercase();
    let title = track.title().to_lowercase();
    let hit_artist = hit.artist.to_lowercase();
    let hit_title = hit.title.to_lowercase();

    let mut score = 0.7 * similarity(&title, &hit_title) + 0.3 * similarity(&artist, &hit_artist);
    if contains_either(&artist, &hit_artist) {
        score += 0.2;
    }
    if contains_either(&title, &hit_title) {
        score += 0.1;
    }
    score
}

fn contains_either(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}

/// Highest-scoring hit above the acceptance threshold; earlier hits win ties
pub fn best_match<'a>(track: &Track, hits: &'a [RemoteTrack]) -> Option<&'a RemoteTrack> {
    let mut best: Option<(&RemoteTrack, f64)> = None;

    for hit in hits {
        let score = match_score(track, hit);
        debug!("Candidate '{}' by {} scored {:.3}", hit.title, hit.artist, score);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((hit, score));
        }
    }

    best.filter(|(_, score)| *score > MIN_MATCH_SCORE).map(|(hit, _)| hit)
}
