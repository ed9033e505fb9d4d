//! Outcome of one filtering pass.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracks::{Platform, Track};

/// What happened to a candidate list.
///
/// Invariants upheld by the engine:
/// - `filtered_tracks` and `removed_tracks` partition the input, each
///   keeping input order
/// - `original_count == filtered_tracks.len() + removed_tracks.len()`
/// - the values of `matches_by_platform` sum to `removed_tracks.len()`
#[derive(Debug, Clone, Serialize)]
pub struct FilterResult {
    pub original_count: usize,
    pub filtered_tracks: Vec<Track>,
    pub removed_tracks: Vec<Track>,
    /// Only platforms that caused at least one removal appear here
    pub matches_by_platform: BTreeMap<Platform, usize>,
    /// One human-readable entry per platform that could not be consulted
    pub errors: Vec<String>,
}

/// Summary numbers for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterStatistics {
    pub original_count: usize,
    pub filtered_count: usize,
    pub removed_count: usize,
    pub removal_percentage: f64,
    pub matches_by_platform: BTreeMap<Platform, usize>,
    pub total_matches: usize,
    pub error_count: usize,
}

impl FilterResult {
    /// Nothing removed, nothing failed
    pub fn passthrough(candidates: Vec<Track>) -> Self {
        Self::passthrough_with_errors(candidates, Vec::new())
    }

    /// Nothing removed, but some platforms reported problems
    pub fn passthrough_with_errors(candidates: Vec<Track>, errors: Vec<String>) -> Self {
        Self {
            original_count: candidates.len(),
            filtered_tracks: candidates,
            removed_tracks: Vec::new(),
            matches_by_platform: BTreeMap::new(),
            errors,
        }
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered_tracks.len()
    }

    pub fn removed_count(&self) -> usize {
        self.removed_tracks.len()
    }

    /// Share of the input that was removed, 0.0 for empty input
    pub fn removal_percentage(&self) -> f64 {
        if self.original_count == 0 {
            return 0.0;
        }
        self.removed_count() as f64 / self.original_count as f64 * 100.0
    }

    pub fn has_filtering_applied(&self) -> bool {
        !self.removed_tracks.is_empty()
    }

    /// True when every consulted platform answered
    pub fn is_successful(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn total_matches(&self) -> usize {
        self.matches_by_platform.values().sum()
    }

    pub fn matches_for(&self, platform: Platform) -> usize {
        self.matches_by_platform.get(&platform).copied().unwrap_or(0)
    }

    pub fn statistics(&self) -> FilterStatistics {
        FilterStatistics {
            original_count: self.original_count,
            filtered_count: self.filtered_count(),
            removed_count: self.removed_count(),
            removal_percentage: (self.removal_percentage() * 10.0).round() / 10.0,
            matches_by_platform: self.matches_by_platform.clone(),
            total_matches: self.total_matches(),
            error_count: self.errors.len(),
        }
    }
}

impl fmt::Display for FilterResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} tracks kept ({} removed",
            self.filtered_count(),
            self.original_count,
            self.removed_count()
        )?;

        if !self.matches_by_platform.is_empty() {
            let parts: Vec<String> = self
                .matches_by_platform
                .iter()
                .map(|(platform, count)| format!("{} {}", count, platform))
                .collect();
            write!(f, ": {}", parts.join(", "))?;
        }

        write!(f, ")")?;

        if !self.errors.is_empty() {
            write!(f, ", {} platform error(s)", self.errors.len())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(artist: &str, title: &str) -> Track {
        Track::new(artist, title, Platform::LastFm).unwrap()
    }

    fn sample() -> FilterResult {
        let mut matches = BTreeMap::new();
        matches.insert(Platform::SoundCloud, 1);
        matches.insert(Platform::Spotify, 1);

        FilterResult {
            original_count: 3,
            filtered_tracks: vec![track("C", "Three")],
            removed_tracks: vec![track("A", "One"), track("B", "Two")],
            matches_by_platform: matches,
            errors: vec![],
        }
    }

    #[test]
    fn test_passthrough() {
        let result = FilterResult::passthrough(vec![track("A", "One"), track("B", "Two")]);
        assert_eq!(result.original_count, 2);
        assert_eq!(result.filtered_count(), 2);
        assert!(!result.has_filtering_applied());
        assert!(result.is_successful());
        assert_eq!(result.removal_percentage(), 0.0);
    }

    #[test]
    fn test_empty_input_percentage() {
        let result = FilterResult::passthrough(vec![]);
        assert_eq!(result.removal_percentage(), 0.0);
    }

    #[test]
    fn test_counts() {
        let result = sample();
        assert_eq!(result.total_matches(), 2);
        assert_eq!(result.matches_for(Platform::Spotify), 1);
        assert_eq!(result.matches_for(Platform::LastFm), 0);

        let stats = result.statistics();
        assert_eq!(stats.removed_count, 2);
        assert_eq!(stats.removal_percentage, 66.7);
        assert_eq!(stats.error_count, 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sample().to_string(),
            "1/3 tracks kept (2 removed: 1 SoundCloud, 1 Spotify)"
        );

        let failed = FilterResult::passthrough_with_errors(
            vec![track("A", "One")],
            vec!["Spotify authentication failed: HTTP 401".into()],
        );
        assert_eq!(failed.to_string(), "1/1 tracks kept (0 removed), 1 platform error(s)");
        assert!(!failed.is_successful());
    }

    #[test]
    fn test_serializes_platform_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["matches_by_platform"]["soundcloud"], 1);
        assert_eq!(json["removed_tracks"].as_array().unwrap().len(), 2);
    }
}
