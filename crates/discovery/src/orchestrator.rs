//! # Playlist Orchestrator
//!
//! This module coordinates the whole discovery flow:
//! 1. Fetch candidate tracks for every tag (in parallel)
//! 2. Merge and deduplicate candidates
//! 3. Drop tracks the user already likes (FilterEngine)
//! 4. Shuffle and pick the requested number of tracks
//!
//! ## Learning Goals
//!
//! This component teaches you:
//! - Fan-out/fan-in with `tokio::spawn` and ordered awaiting
//! - Error handling across async boundaries (`anyhow::Context`)
//! - Keeping a non-`Send` RNG out of async state
//! - Combining multiple components into a pipeline

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{info, instrument, warn};

use pipeline::{FilterConfig, FilterEngine, FilterStatistics};
use sources::{SourceError, TagSource};
use tracks::{Platform, Track};

/// Default number of candidates requested per tag
pub const DEFAULT_LIMIT_PER_TAG: usize = 50;

/// The generated playlist plus enough context to explain it
#[derive(Debug, Clone, Serialize)]
pub struct DailyPlaylist {
    pub tags: Vec<String>,
    pub tracks: Vec<Track>,
    /// Unique candidates before filtering
    pub total_fetched: usize,
    pub filter_stats: FilterStatistics,
    /// Failed tags and platforms; the playlist is still usable
    pub errors: Vec<String>,
}

/// Main orchestrator that coordinates tag search and filtering
#[derive(Clone)]
pub struct PlaylistOrchestrator {
    tag_source: Arc<dyn TagSource>,
    engine: Arc<FilterEngine>,
    limit_per_tag: usize,
}

impl PlaylistOrchestrator {
    pub fn new(tag_source: Arc<dyn TagSource>, engine: Arc<FilterEngine>) -> Self {
        Self {
            tag_source,
            engine,
            limit_per_tag: DEFAULT_LIMIT_PER_TAG,
        }
    }

    pub fn with_limit_per_tag(mut self, limit: usize) -> Self {
        self.limit_per_tag = limit;
        self
    }

    /// Main entry point: build a playlist for `tags`
    ///
    /// # Arguments
    /// * `tags` - Tags to search (e.g. "electronic", "shoegaze")
    /// * `num_tracks` - Playlist length
    /// * `filter_config` - Which platforms to filter against
    ///
    /// # Returns
    /// The playlist; per-tag and per-platform failures are listed in
    /// `DailyPlaylist::errors`. Fails only for an empty tag list or when
    /// every tag search failed.
    pub async fn generate(
        &self,
        tags: &[String],
        num_tracks: usize,
        filter_config: &FilterConfig,
    ) -> Result<DailyPlaylist> {
        let start_time = Instant::now();

        let tags: Vec<String> = tags
            .iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        if tags.is_empty() {
            bail!("At least one tag is required");
        }

        let (per_tag, mut errors) = self.fetch_all_tags(&tags).await;
        if per_tag.iter().all(Vec::is_empty) && errors.len() == tags.len() {
            bail!("Every tag search failed: {}", errors.join("; "));
        }

        let candidates = merge_candidates(per_tag);
        let total_fetched = candidates.len();
        info!(
            "Merged candidates for {} tag(s), total after deduplication: {}",
            tags.len(),
            total_fetched
        );

        let filter_result = self.engine.filter_tracks(candidates, filter_config).await;
        for error in &filter_result.errors {
            warn!("Filtering: {}", error);
        }
        let filter_stats = filter_result.statistics();
        errors.extend(filter_result.errors);

        // ThreadRng is created after the last await
        let tracks = select_tracks(filter_result.filtered_tracks, num_tracks, &mut rand::rng());

        info!(
            "Selected {} of {} tracks ({} filtered out) in {:.2?}",
            tracks.len(),
            total_fetched,
            filter_stats.removed_count,
            start_time.elapsed()
        );

        Ok(DailyPlaylist {
            tags,
            tracks,
            total_fetched,
            filter_stats,
            errors,
        })
    }

    /// Fetch every tag concurrently. Results come back in tag order;
    /// failed tags contribute an error string instead of tracks.
    async fn fetch_all_tags(&self, tags: &[String]) -> (Vec<Vec<Track>>, Vec<String>) {
        let handles: Vec<_> = tags
            .iter()
            .map(|tag| {
                let source = self.tag_source.clone();
                let tag = tag.clone();
                let limit = self.limit_per_tag;
                tokio::spawn(async move { fetch_tag(source.as_ref(), &tag, limit).await })
            })
            .collect();

        let mut per_tag = Vec::with_capacity(tags.len());
        let mut errors = Vec::new();

        for (tag, handle) in tags.iter().zip(handles) {
            match handle.await.context("Tag search task panicked") {
                Ok(Ok(tracks)) => per_tag.push(tracks),
                Ok(Err(err)) => {
                    warn!("Skipping tag '{}': {}", tag, err);
                    errors.push(format!("tag '{}': {}", tag, err));
                }
                Err(err) => {
                    warn!("Skipping tag '{}': {:#}", tag, err);
                    errors.push(format!("tag '{}': {:#}", tag, err));
                }
            }
        }

        (per_tag, errors)
    }
}

#[instrument(skip(source))]
async fn fetch_tag(source: &dyn TagSource, tag: &str, limit: usize) -> Result<Vec<Track>, SourceError> {
    let raw = source.fetch_tracks_for_tag(tag, limit).await?;
    let tracks: Vec<Track> = raw
        .into_iter()
        .filter_map(|item| item.into_track(Platform::LastFm).ok())
        .collect();

    info!("Fetched {} tracks for tag '{}'", tracks.len(), tag);
    Ok(tracks)
}

/// Flatten per-tag results, keeping the first occurrence of each song.
///
/// Two tracks are the same song when artist and title agree ignoring case,
/// the same rule as `Track::same_identity`.
pub fn merge_candidates(per_tag: Vec<Vec<Track>>) -> Vec<Track> {
    let mut seen: HashSet<(String, String)> = HashSet::new();

    per_tag
        .into_iter()
        .flatten()
        .filter(|track| seen.insert((track.artist().to_lowercase(), track.title().to_lowercase())))
        .collect()
}

/// Shuffle and keep at most `num_tracks`
pub fn select_tracks<R: Rng + ?Sized>(mut tracks: Vec<Track>, num_tracks: usize, rng: &mut R) -> Vec<Track> {
    tracks.shuffle(rng);
    tracks.truncate(num_tracks);
    tracks
}
