//! Two-tier track matching.
//!
//! Tier one is exact equality of normalized keys. Tier two is fuzzy: the
//! artist keys and the title keys must each clear their own similarity
//! threshold. Artist names tend to be spelled consistently across
//! platforms, so the artist bar sits higher than the title bar.
//!
//! ## Learning Goals
//! - `Option` chaining with `?` inside a non-`Result` function
//! - Cheap upper bounds to skip expensive work
//!
//! Rust concept: `Copy` structs
//! `Matcher` is two floats, so it is passed by value into rayon closures
//! without any `Arc` or cloning ceremony.

use crate::normalize::NormalizedKey;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_ARTIST_THRESHOLD: f64 = 0.85;
pub const DEFAULT_TITLE_THRESHOLD: f64 = 0.80;

/// How two keys were found to be the same song
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchKind {
    Exact,
    Fuzzy { artist: f64, title: f64 },
}

/// Threshold pair for the fuzzy tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Matcher {
    pub artist_threshold: f64,
    pub title_threshold: f64,
}

impl Default for Matcher {
    fn default() -> Self {
        Self {
            artist_threshold: DEFAULT_ARTIST_THRESHOLD,
            title_threshold: DEFAULT_TITLE_THRESHOLD,
        }
    }
}

impl Matcher {
    /// Thresholds are clamped to [0, 1]
    pub fn new(artist_threshold: f64, title_threshold: f64) -> Self {
        Self {
            artist_threshold: artist_threshold.clamp(0.0, 1.0),
            title_threshold: title_threshold.clamp(0.0, 1.0),
        }
    }

    /// Compare two keys. `None` means "different songs".
    ///
    /// Keys with an empty component never match anything, including
    /// each other.
    pub fn compare(&self, a: &NormalizedKey, b: &NormalizedKey) -> Option<MatchKind> {
        if a.is_empty() || b.is_empty() {
            return None;
        }

        if a == b {
            return Some(MatchKind::Exact);
        }

        let artist = similarity_at_least(&a.artist_key, &b.artist_key, self.artist_threshold)?;
        let title = similarity_at_least(&a.title_key, &b.title_key, self.title_threshold)?;

        Some(MatchKind::Fuzzy { artist, title })
    }

    pub fn is_match(&self, a: &NormalizedKey, b: &NormalizedKey) -> bool {
        self.compare(a, b).is_some()
    }
}

/// Symmetric similarity score in [0, 1]; identical strings score 1.0.
///
/// Base score is the normalized Levenshtein ratio. Short "marker" tokens
/// (single characters, numbers) carry identity that a character ratio
/// underweights: "artist a" and "artist b" differ by one edit yet name
/// different acts, as do "symphony no 5" and "symphony no 9". When the
/// marker tokens differ, the score is capped by token overlap.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let ratio = strsim::normalized_levenshtein(a, b);

    if marker_tokens(a) == marker_tokens(b) {
        ratio
    } else {
        ratio.min(token_overlap(a, b))
    }
}

/// Similarity if it reaches `threshold`, skipping the edit-distance work
/// when the length ratio already rules it out.
fn similarity_at_least(a: &str, b: &str, threshold: f64) -> Option<f64> {
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    let longest = len_a.max(len_b);

    // Distance is at least the length difference, so the ratio can never
    // exceed shortest / longest
    if longest > 0 && (len_a.min(len_b) as f64 / longest as f64) < threshold {
        return None;
    }

    let score = similarity(a, b);
    (score >= threshold).then_some(score)
}

fn is_marker(token: &str) -> bool {
    token.chars().count() == 1 || token.chars().all(|c| c.is_ascii_digit())
}

fn marker_tokens(s: &str) -> Vec<&str> {
    let mut markers: Vec<&str> = s.split_whitespace().filter(|t| is_marker(t)).collect();
    markers.sort_unstable();
    markers
}

/// Jaccard index over whitespace tokens
fn token_overlap(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();

    let union = left.union(&right).count();
    if union == 0 {
        return 1.0;
    }

    left.intersection(&right).count() as f64 / union as f64
}
