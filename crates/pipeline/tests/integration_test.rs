//! Integration tests for the filter engine.
//!
//! These tests drive `FilterEngine::filter_tracks` end to end through a
//! fake client factory, so config handling, aggregation and matching are
//! exercised together without any network.

use async_trait::async_trait;
use pipeline::{
    FavoritesSource, FilterConfig, FilterEngine, FilterSettings, Matcher, NormalizedKey, PlatformAggregator,
    PlatformConfig, RetryPolicy, filter_with_sources,
};
use sources::{ClientFactory, Credentials, LikedPage, LikedTracksClient, RawTrack, SourceError};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracks::{Platform, Track};

/// What a fake platform does when asked for liked tracks
#[derive(Clone)]
enum Behavior {
    Likes(Vec<(&'static str, &'static str)>),
    RejectCredentials,
    Unreachable,
}

struct FakeClient {
    platform: Platform,
    behavior: Behavior,
    requests: Arc<AtomicUsize>,
}

#[async_trait]
impl LikedTracksClient for FakeClient {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_liked_tracks(&self, _limit: usize, _cursor: Option<&str>) -> sources::Result<LikedPage> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Likes(items) => Ok(LikedPage {
                tracks: items.iter().map(|(a, t)| RawTrack::new(*a, *t)).collect(),
                next_cursor: None,
            }),
            Behavior::RejectCredentials => Err(SourceError::authentication(self.platform, "HTTP 401")),
            Behavior::Unreachable => Err(SourceError::transient(self.platform, "connection refused")),
        }
    }
}

#[derive(Default)]
struct FakeFactory {
    behaviors: HashMap<Platform, Behavior>,
    requests: Arc<AtomicUsize>,
}

impl FakeFactory {
    fn with(mut self, platform: Platform, behavior: Behavior) -> Self {
        self.behaviors.insert(platform, behavior);
        self
    }
}

impl ClientFactory for FakeFactory {
    fn build(&self, platform: Platform, credentials: &Credentials) -> sources::Result<Box<dyn LikedTracksClient>> {
        credentials.require(platform, "token")?;
        let behavior = self
            .behaviors
            .get(&platform)
            .cloned()
            .ok_or_else(|| SourceError::configuration(platform, "no client available"))?;

        Ok(Box::new(FakeClient {
            platform,
            behavior,
            requests: self.requests.clone(),
        }))
    }
}

fn track(artist: &str, title: &str) -> Track {
    Track::new(artist, title, Platform::LastFm).unwrap()
}

fn enabled(platform: Platform) -> PlatformConfig {
    PlatformConfig::new(platform, Credentials::new().with("token", "secret"))
}

fn config(platforms: Vec<PlatformConfig>) -> FilterConfig {
    FilterConfig {
        enabled: true,
        platforms,
        tuning: FilterSettings {
            retry: RetryPolicy::none(),
            ..FilterSettings::default()
        },
    }
}

fn engine(factory: FakeFactory) -> FilterEngine {
    FilterEngine::new(Arc::new(factory))
}

#[tokio::test]
async fn test_radio_edit_matches_plain_title() {
    let engine = engine(FakeFactory::default().with(
        Platform::SoundCloud,
        Behavior::Likes(vec![("Daft Punk", "One More Time (Radio Edit)")]),
    ));

    let result = engine
        .filter_tracks(
            vec![track("Daft Punk", "One More Time")],
            &config(vec![enabled(Platform::SoundCloud)]),
        )
        .await;

    assert_eq!(result.removed_count(), 1);
    assert_eq!(result.filtered_count(), 0);
    assert_eq!(result.matches_for(Platform::SoundCloud), 1);
    assert!(result.is_successful());
}

#[tokio::test]
async fn test_leading_article_is_ignored() {
    let engine = engine(
        FakeFactory::default().with(Platform::Spotify, Behavior::Likes(vec![("Beatles", "Let It Be")])),
    );

    let result = engine
        .filter_tracks(
            vec![track("The Beatles", "Let It Be")],
            &config(vec![enabled(Platform::Spotify)]),
        )
        .await;

    assert_eq!(result.removed_tracks[0].artist(), "The Beatles");
    assert_eq!(result.matches_for(Platform::Spotify), 1);
}

#[tokio::test]
async fn test_auth_failure_keeps_candidates() {
    let engine = engine(FakeFactory::default().with(Platform::Spotify, Behavior::RejectCredentials));

    let result = engine
        .filter_tracks(
            vec![track("Daft Punk", "Aerodynamic")],
            &config(vec![enabled(Platform::Spotify)]),
        )
        .await;

    assert_eq!(result.filtered_count(), 1);
    assert!(!result.has_filtering_applied());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("Spotify"));
    assert!(result.errors[0].contains("HTTP 401"));
    assert!(result.matches_by_platform.is_empty());
}

#[tokio::test]
async fn test_one_platform_fails_other_removes() {
    let engine = engine(
        FakeFactory::default()
            .with(Platform::SoundCloud, Behavior::Unreachable)
            .with(Platform::Spotify, Behavior::Likes(vec![("Daft Punk", "Aerodynamic")])),
    );

    let result = engine
        .filter_tracks(
            vec![track("Daft Punk", "Aerodynamic"), track("Justice", "Genesis")],
            &config(vec![enabled(Platform::SoundCloud), enabled(Platform::Spotify)]),
        )
        .await;

    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("SoundCloud"));
    assert_eq!(result.matches_for(Platform::Spotify), 1);
    assert_eq!(result.matches_for(Platform::SoundCloud), 0);
    assert!(!result.matches_by_platform.contains_key(&Platform::SoundCloud));
    assert_eq!(result.removed_tracks[0].title(), "Aerodynamic");
    assert_eq!(result.filtered_tracks[0].title(), "Genesis");
}

#[tokio::test]
async fn test_different_artist_same_title_is_kept() {
    let engine = engine(
        FakeFactory::default().with(Platform::Spotify, Behavior::Likes(vec![("Bonobo", "Archangel")])),
    );

    let result = engine
        .filter_tracks(
            vec![track("Burial", "Archangel")],
            &config(vec![enabled(Platform::Spotify)]),
        )
        .await;

    assert_eq!(result.filtered_count(), 1);
    assert_eq!(result.removed_count(), 0);

    // Same shape with single-letter names
    let matcher = Matcher::default();
    assert!(!matcher.is_match(&NormalizedKey::new("Artist A", "Song X"), &NormalizedKey::new("Artist B", "Song X")));
}

#[tokio::test]
async fn test_fuzzy_match_removes_typo() {
    let engine = engine(
        FakeFactory::default().with(Platform::SoundCloud, Behavior::Likes(vec![("Radiohed", "Karma Police")])),
    );

    let result = engine
        .filter_tracks(
            vec![track("Radiohead", "Karma Police")],
            &config(vec![enabled(Platform::SoundCloud)]),
        )
        .await;

    assert_eq!(result.removed_count(), 1);
}

#[tokio::test]
async fn test_partition_preserves_order() {
    let engine = engine(FakeFactory::default().with(
        Platform::Spotify,
        Behavior::Likes(vec![("B", "Two"), ("D", "Four"), ("Beyoncé", "Halo")]),
    ));

    let candidates = vec![
        track("A", "One"),
        track("B", "Two"),
        track("C", "Three"),
        track("D", "Four"),
        track("Beyonce", "Halo"),
        track("E", "Five"),
    ];

    let result = engine
        .filter_tracks(candidates.clone(), &config(vec![enabled(Platform::Spotify)]))
        .await;

    assert_eq!(result.original_count, candidates.len());
    assert_eq!(result.filtered_count() + result.removed_count(), candidates.len());

    let kept: Vec<&str> = result.filtered_tracks.iter().map(|t| t.title()).collect();
    let removed: Vec<&str> = result.removed_tracks.iter().map(|t| t.title()).collect();
    assert_eq!(kept, vec!["One", "Three", "Five"]);
    assert_eq!(removed, vec!["Two", "Four", "Halo"]);
    assert_eq!(result.total_matches(), result.removed_count());
}

#[tokio::test]
async fn test_no_platforms_is_neutral() {
    let factory = FakeFactory::default().with(Platform::Spotify, Behavior::Likes(vec![("A", "One")]));
    let requests = factory.requests.clone();
    let engine = engine(factory);
    let candidates = vec![track("A", "One"), track("B", "Two")];

    // Nothing configured
    let result = engine.filter_tracks(candidates.clone(), &config(vec![])).await;
    assert_eq!(result.filtered_tracks, candidates);
    assert!(result.removed_tracks.is_empty());
    assert!(result.errors.is_empty());

    // Configured but switched off, individually or globally
    let result = engine
        .filter_tracks(candidates.clone(), &config(vec![PlatformConfig::disabled(Platform::Spotify)]))
        .await;
    assert_eq!(result.filtered_tracks, candidates);

    let mut off = config(vec![enabled(Platform::Spotify)]);
    off.enabled = false;
    let result = engine.filter_tracks(candidates.clone(), &off).await;
    assert_eq!(result.filtered_tracks, candidates);
    assert!(result.errors.is_empty());

    assert_eq!(requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_candidates_skip_fetching() {
    let factory = FakeFactory::default().with(Platform::Spotify, Behavior::Likes(vec![("A", "One")]));
    let requests = factory.requests.clone();
    let engine = engine(factory);

    let result = engine.filter_tracks(vec![], &config(vec![enabled(Platform::Spotify)])).await;
    assert_eq!(result.original_count, 0);
    assert_eq!(result.removal_percentage(), 0.0);
    assert_eq!(requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_no_configured_platform_is_silent() {
    let factory = FakeFactory::default().with(Platform::Spotify, Behavior::Likes(vec![("A", "One")]));
    let requests = factory.requests.clone();
    let engine = engine(factory);

    let result = engine
        .filter_tracks(
            vec![track("A", "One")],
            &config(vec![PlatformConfig::new(Platform::Spotify, Credentials::new())]),
        )
        .await;

    assert_eq!(result.filtered_count(), 1);
    assert!(result.errors.is_empty());
    assert!(!result.has_filtering_applied());
    assert_eq!(requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_credentials_recorded_next_to_valid_platform() {
    let engine = engine(
        FakeFactory::default()
            .with(Platform::SoundCloud, Behavior::Likes(vec![("A", "One")]))
            .with(Platform::Spotify, Behavior::Likes(vec![("B", "Two")])),
    );

    let result = engine
        .filter_tracks(
            vec![track("A", "One"), track("B", "Two")],
            &config(vec![
                enabled(Platform::SoundCloud),
                PlatformConfig::new(Platform::Spotify, Credentials::new()),
            ]),
        )
        .await;

    assert_eq!(result.removed_count(), 1);
    assert_eq!(result.filtered_tracks[0].title(), "Two");
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("not configured"));
}

#[tokio::test]
async fn test_errors_follow_configuration_order() {
    let engine = engine(
        FakeFactory::default()
            .with(Platform::SoundCloud, Behavior::RejectCredentials)
            .with(Platform::Spotify, Behavior::Likes(vec![("A", "One")])),
    );

    let result = engine
        .filter_tracks(
            vec![track("A", "One")],
            &config(vec![
                enabled(Platform::SoundCloud),
                PlatformConfig::new(Platform::Spotify, Credentials::new()),
            ]),
        )
        .await;

    assert_eq!(result.filtered_count(), 1);
    assert_eq!(result.errors.len(), 2);
    assert!(result.errors[0].contains("SoundCloud"), "{:?}", result.errors);
    assert!(result.errors[1].contains("Spotify is not configured"), "{:?}", result.errors);
}

#[tokio::test]
async fn test_first_platform_gets_credit() {
    let engine = engine(
        FakeFactory::default()
            .with(Platform::SoundCloud, Behavior::Likes(vec![("A", "One")]))
            .with(Platform::Spotify, Behavior::Likes(vec![("A", "One")])),
    );
    let candidates = vec![track("A", "One")];

    let result = engine
        .filter_tracks(
            candidates.clone(),
            &config(vec![enabled(Platform::Spotify), enabled(Platform::SoundCloud)]),
        )
        .await;
    assert_eq!(result.matches_for(Platform::Spotify), 1);
    assert_eq!(result.matches_for(Platform::SoundCloud), 0);

    let result = engine
        .filter_tracks(
            candidates,
            &config(vec![enabled(Platform::SoundCloud), enabled(Platform::Spotify)]),
        )
        .await;
    assert_eq!(result.matches_for(Platform::SoundCloud), 1);
    assert_eq!(result.matches_for(Platform::Spotify), 0);
}

#[tokio::test]
async fn test_repeated_calls_agree() {
    let engine = engine(FakeFactory::default().with(
        Platform::SoundCloud,
        Behavior::Likes(vec![("Massive Attack", "Teardrop"), ("Portishead", "Roads")]),
    ));
    let candidates = vec![
        track("Massive Attack", "Teardrop (Live)"),
        track("Portishead", "Glory Box"),
        track("Tricky", "Hell Is Round the Corner"),
    ];
    let config = config(vec![enabled(Platform::SoundCloud)]);

    let first = engine.filter_tracks(candidates.clone(), &config).await;
    let second = engine.filter_tracks(candidates, &config).await;

    assert_eq!(first.filtered_tracks, second.filtered_tracks);
    assert_eq!(first.removed_tracks, second.removed_tracks);
    assert_eq!(first.matches_by_platform, second.matches_by_platform);
}

#[tokio::test]
async fn test_shared_sources_fetch_once() {
    let factory = FakeFactory::default().with(Platform::Spotify, Behavior::Likes(vec![("A", "One")]));
    let requests = factory.requests.clone();
    let client = factory
        .build(Platform::Spotify, &Credentials::new().with("token", "secret"))
        .unwrap();

    let sources: Vec<Arc<dyn FavoritesSource>> =
        vec![Arc::new(PlatformAggregator::new(client, &FilterSettings::default()))];

    let first = filter_with_sources(vec![track("A", "One")], &sources, Matcher::default()).await;
    let second = filter_with_sources(vec![track("A", "One"), track("B", "Two")], &sources, Matcher::default()).await;

    assert_eq!(first.removed_count(), 1);
    assert_eq!(second.removed_count(), 1);
    assert_eq!(requests.load(Ordering::SeqCst), 1);
}
