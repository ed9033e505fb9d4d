//! The filter engine: drop candidates the user already likes.
//!
//! ## Algorithm
//! 1. Empty candidate list or no enabled platform → passthrough, no I/O
//! 2. Build one aggregator per enabled platform (configuration order);
//!    a platform whose client can't be built contributes an error, unless
//!    none could be built, which is a silent passthrough
//! 3. Fetch every platform's favorites concurrently; errors are listed in
//!    configuration order
//! 4. Normalize all favorites once into a flat reference list
//! 5. Match candidates in parallel; the first reference entry that
//!    matches decides attribution
//! 6. Partition candidates into kept and removed, preserving order
//!
//! Rust concept: `tokio::spawn` + `spawn_blocking` + `rayon`
//! Network fetches run as async tasks. Normalizing and matching are
//! CPU-bound, so they leave the runtime via `spawn_blocking` and fan out on
//! rayon's pool. Indexed parallel iterators collect in input order, so the
//! output is deterministic regardless of scheduling.

use crate::aggregator::{Favorites, PlatformAggregator};
use crate::config::FilterConfig;
use crate::matcher::{MatchKind, Matcher};
use crate::normalize::NormalizedKey;
use crate::result::FilterResult;
use crate::traits::FavoritesSource;
use rayon::prelude::*;
use sources::ClientFactory;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use tracks::{Platform, Track};

/// Filters candidate tracks against the user's favorites.
///
/// Holds no per-run state: every call builds fresh aggregators, so two
/// calls with the same inputs and the same upstream data agree.
pub struct FilterEngine {
    factory: Arc<dyn ClientFactory>,
}

/// A platform that is either ready to fetch or already known to be broken
enum SourceSlot {
    Ready(Arc<dyn FavoritesSource>),
    Unavailable(String),
}

enum PendingFetch {
    Running(Platform, JoinHandle<Favorites>),
    Failed(String),
}

impl FilterEngine {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self { factory }
    }

    /// Remove candidates that match a favorite on any enabled platform.
    ///
    /// Never fails. Platform problems show up in `FilterResult::errors`
    /// and leave the candidates untouched.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn filter_tracks(&self, candidates: Vec<Track>, config: &FilterConfig) -> FilterResult {
        if candidates.is_empty() {
            warn!("No tracks provided for filtering");
            return FilterResult::passthrough(candidates);
        }

        if !config.has_enabled_platforms() {
            debug!("No platforms enabled for filtering");
            return FilterResult::passthrough(candidates);
        }

        let slots: Vec<SourceSlot> = config
            .enabled_platforms()
            .map(|platform_config| {
                match self
                    .factory
                    .build(platform_config.platform, &platform_config.credentials)
                {
                    Ok(client) => SourceSlot::Ready(Arc::new(PlatformAggregator::new(
                        client,
                        &config.tuning,
                    ))),
                    Err(err) => {
                        warn!("Skipping {}: {}", platform_config.platform, err);
                        SourceSlot::Unavailable(err.to_string())
                    }
                }
            })
            .collect();

        if slots.iter().all(|slot| matches!(slot, SourceSlot::Unavailable(_))) {
            warn!("No enabled platform is configured, filtering disabled");
            return FilterResult::passthrough(candidates);
        }

        run_filter(candidates, slots, config.tuning.matcher()).await
    }
}

/// Filter against sources that are already built, in attribution order.
///
/// Reusing the same sources across calls reuses their cached favorites.
pub async fn filter_with_sources(
    candidates: Vec<Track>,
    sources: &[Arc<dyn FavoritesSource>],
    matcher: Matcher,
) -> FilterResult {
    if candidates.is_empty() || sources.is_empty() {
        return FilterResult::passthrough(candidates);
    }

    let slots: Vec<SourceSlot> = sources.iter().cloned().map(SourceSlot::Ready).collect();
    run_filter(candidates, slots, matcher).await
}

async fn run_filter(candidates: Vec<Track>, slots: Vec<SourceSlot>, matcher: Matcher) -> FilterResult {
    let start = Instant::now();
    let mut favorites = Vec::with_capacity(slots.len());
    let mut errors = Vec::new();

    for outcome in collect_favorites(slots).await {
        match outcome {
            Ok(set) => {
                if let Some(error) = &set.error {
                    errors.push(error.clone());
                }
                favorites.push(set);
            }
            Err(error) => errors.push(error),
        }
    }

    let candidates = Arc::new(candidates);
    let shared = candidates.clone();
    let matching = tokio::task::spawn_blocking(move || match_candidates(&shared, &favorites, &matcher)).await;
    let candidates = Arc::try_unwrap(candidates).unwrap_or_else(|shared| shared.as_ref().clone());

    let verdicts = match matching {
        Ok(Some(verdicts)) => verdicts,
        Ok(None) => return FilterResult::passthrough_with_errors(candidates, errors),
        Err(join_error) => {
            warn!("Matching task failed: {}", join_error);
            errors.push(format!("matching aborted: {}", join_error));
            return FilterResult::passthrough_with_errors(candidates, errors);
        }
    };

    let original_count = candidates.len();
    let mut filtered_tracks = Vec::with_capacity(original_count);
    let mut removed_tracks = Vec::new();
    let mut matches_by_platform = BTreeMap::new();

    for (candidate, verdict) in candidates.into_iter().zip(verdicts) {
        match verdict {
            Some(platform) => {
                *matches_by_platform.entry(platform).or_insert(0) += 1;
                removed_tracks.push(candidate);
            }
            None => filtered_tracks.push(candidate),
        }
    }

    let result = FilterResult {
        original_count,
        filtered_tracks,
        removed_tracks,
        matches_by_platform,
        errors,
    };

    info!("Filtering complete in {:?}: {}", start.elapsed(), result);
    result
}

/// The CPU-bound half of a run: one verdict per candidate, in candidate
/// order, or `None` when there is nothing to match against.
fn match_candidates(candidates: &[Track], favorites: &[Favorites], matcher: &Matcher) -> Option<Vec<Option<Platform>>> {
    let reference = build_reference(favorites);
    info!(
        "Matching {} candidates against {} favorites from {} platform(s)",
        candidates.len(),
        reference.len(),
        favorites.len()
    );

    if reference.is_empty() {
        return None;
    }

    Some(
        candidates
            .par_iter()
            .map(|candidate| find_match(candidate, &reference, matcher))
            .collect(),
    )
}

/// Fetch every ready source concurrently. One outcome per slot, in slot
/// order; a slot that never produced favorites yields its error.
async fn collect_favorites(slots: Vec<SourceSlot>) -> Vec<Result<Favorites, String>> {
    let pending: Vec<PendingFetch> = slots
        .into_iter()
        .map(|slot| match slot {
            SourceSlot::Ready(source) => {
                let platform = source.platform();
                PendingFetch::Running(
                    platform,
                    tokio::spawn(async move { source.fetch_favorites().await }),
                )
            }
            SourceSlot::Unavailable(error) => PendingFetch::Failed(error),
        })
        .collect();

    let mut outcomes = Vec::with_capacity(pending.len());
    for fetch in pending {
        let outcome = match fetch {
            PendingFetch::Running(platform, handle) => handle.await.map_err(|join_error| {
                warn!("{} favorites task failed: {}", platform, join_error);
                format!("{} favorites fetch aborted: {}", platform, join_error)
            }),
            PendingFetch::Failed(error) => Err(error),
        };
        outcomes.push(outcome);
    }

    outcomes
}

/// Normalize every favorite once. Order is platform order, then the
/// order each platform returned its tracks in.
fn build_reference(favorites: &[Favorites]) -> Vec<(Platform, NormalizedKey)> {
    favorites
        .iter()
        .flat_map(|set| set.tracks.iter().map(move |track| (set.platform, track)))
        .collect::<Vec<_>>()
        .par_iter()
        .map(|(platform, track)| (*platform, NormalizedKey::from_track(track)))
        .filter(|(_, key)| !key.is_empty())
        .collect()
}

fn find_match(candidate: &Track, reference: &[(Platform, NormalizedKey)], matcher: &Matcher) -> Option<Platform> {
    let key = NormalizedKey::from_track(candidate);
    if key.is_empty() {
        return None;
    }

    reference.iter().find_map(|(platform, favorite)| {
        matcher.compare(&key, favorite).map(|kind| {
            match kind {
                MatchKind::Exact => debug!("{} matched exactly on {}", candidate, platform),
                MatchKind::Fuzzy { artist, title } => debug!(
                    "{} matched {} - {} on {} (artist {:.2}, title {:.2})",
                    candidate, favorite.title_key, favorite.artist_key, platform, artist, title
                ),
            }
            *platform
        })
    })
}
