//! Per-platform favorites aggregation.
//!
//! A `PlatformAggregator` walks a platform's paginated "liked tracks"
//! endpoint until the upstream runs out of pages or the configured
//! maximum is reached. Each page request gets its own timeout and is
//! retried on transient failures. The finished set is cached for the
//! lifetime of the aggregator.
//!
//! Failures never escape: any error, including one on page 7 of 10,
//! yields an empty favorites set plus an error description. A partial
//! set would silently under-filter, which is worse than not filtering.
//!
//! ## Learning Goals
//! - `tokio::sync::OnceCell` for async memoization
//! - `Arc<[T]>` for cheap sharing of an immutable collection
//! - Cursor-driven pagination with a hard page cap

use crate::config::FilterSettings;
use crate::retry::RetryPolicy;
use crate::traits::FavoritesSource;
use async_trait::async_trait;
use sources::{LikedPage, LikedTracksClient, SourceError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};
use tracks::{Platform, Track};

/// Stop paginating after this many pages even if the upstream keeps
/// handing out cursors
pub const MAX_PAGES: usize = 200;

/// A complete favorites set for one platform (or an empty one plus the
/// reason it is empty).
#[derive(Debug, Clone)]
pub struct Favorites {
    pub platform: Platform,
    pub tracks: Arc<[Track]>,
    /// Raw items received from the upstream
    pub fetched: usize,
    /// Raw items dropped because artist or title was blank
    pub skipped: usize,
    pub error: Option<String>,
}

impl Favorites {
    pub fn new(platform: Platform, tracks: Vec<Track>) -> Self {
        let fetched = tracks.len();
        Self {
            platform,
            tracks: tracks.into(),
            fetched,
            skipped: 0,
            error: None,
        }
    }

    pub fn failed(platform: Platform, error: impl Into<String>) -> Self {
        Self {
            platform,
            tracks: Arc::from(Vec::<Track>::new()),
            fetched: 0,
            skipped: 0,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Fetches and memoizes one platform's favorites.
pub struct PlatformAggregator {
    client: Box<dyn LikedTracksClient>,
    retry: RetryPolicy,
    max_favorites: usize,
    page_size: usize,
    fetch_timeout: Duration,
    cache: OnceCell<Favorites>,
}

impl PlatformAggregator {
    pub fn new(client: Box<dyn LikedTracksClient>, settings: &FilterSettings) -> Self {
        Self {
            client,
            retry: settings.retry.clone(),
            max_favorites: settings.max_favorites,
            page_size: settings.page_size.max(1),
            fetch_timeout: settings.fetch_timeout(),
            cache: OnceCell::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn is_cached(&self) -> bool {
        self.cache.initialized()
    }

    /// Forget the memoized set; the next fetch goes to the network again
    pub fn clear_cache(&mut self) {
        if self.cache.take().is_some() {
            debug!("Cleared {} favorites cache", self.client.platform());
        }
    }

    #[instrument(skip(self), fields(platform = %self.client.platform()))]
    async fn fetch_all(&self) -> Result<Favorites, SourceError> {
        let platform = self.client.platform();
        let start = Instant::now();

        let mut tracks = Vec::new();
        let mut fetched = 0;
        let mut skipped = 0;
        let mut cursor: Option<String> = None;
        let mut pages = 0;

        while fetched < self.max_favorites {
            if pages == MAX_PAGES {
                warn!(
                    "{} kept returning pages; stopping after {} pages",
                    platform, MAX_PAGES
                );
                break;
            }

            let remaining = self.max_favorites - fetched;
            let page = self
                .fetch_page(remaining.min(self.page_size), cursor.as_deref())
                .await?;
            pages += 1;

            debug!(
                "{} page {}: {} items, more: {}",
                platform,
                pages,
                page.tracks.len(),
                page.next_cursor.is_some()
            );

            // Upstreams occasionally ignore the requested limit
            for raw in page.tracks.into_iter().take(remaining) {
                fetched += 1;
                match raw.into_track(platform) {
                    Ok(track) => tracks.push(track),
                    Err(err) => {
                        skipped += 1;
                        debug!("Skipping {} item: {}", platform, err);
                    }
                }
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        if skipped > 0 {
            warn!("{}: skipped {} liked items with missing artist or title", platform, skipped);
        }
        info!(
            "Fetched {} {} favorites in {} pages ({:?})",
            tracks.len(),
            platform,
            pages,
            start.elapsed()
        );

        Ok(Favorites {
            platform,
            tracks: tracks.into(),
            fetched,
            skipped,
            error: None,
        })
    }

    /// One page, with timeout and retry
    async fn fetch_page(&self, limit: usize, cursor: Option<&str>) -> Result<LikedPage, SourceError> {
        let platform = self.client.platform();
        let client = self.client.as_ref();
        let timeout = self.fetch_timeout;
        let label = format!("{} liked tracks", platform);

        self.retry
            .run(&label, |attempt| async move {
                debug!("Requesting {} liked tracks (attempt {})", platform, attempt);
                match tokio::time::timeout(timeout, client.fetch_liked_tracks(limit, cursor)).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceError::transient(
                        platform,
                        format!("no response within {:?}", timeout),
                    )),
                }
            })
            .await
    }
}

#[async_trait]
impl FavoritesSource for PlatformAggregator {
    fn platform(&self) -> Platform {
        self.client.platform()
    }

    async fn fetch_favorites(&self) -> Favorites {
        self.cache
            .get_or_init(|| async {
                match self.fetch_all().await {
                    Ok(favorites) => favorites,
                    Err(err) => {
                        warn!("Could not fetch {} favorites: {}", self.platform(), err);
                        Favorites::failed(self.platform(), err.to_string())
                    }
                }
            })
            .await
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sources::RawTrack;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Plays back a fixed sequence of responses, one per request
    struct ScriptedClient {
        platform: Platform,
        responses: Mutex<VecDeque<sources::Result<LikedPage>>>,
        calls: Arc<AtomicUsize>,
        limits: Arc<Mutex<Vec<usize>>>,
    }

    impl ScriptedClient {
        fn new(platform: Platform, responses: Vec<sources::Result<LikedPage>>) -> Self {
            Self {
                platform,
                responses: Mutex::new(responses.into()),
                calls: Arc::new(AtomicUsize::new(0)),
                limits: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl LikedTracksClient for ScriptedClient {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn fetch_liked_tracks(&self, limit: usize, _cursor: Option<&str>) -> sources::Result<LikedPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.limits.lock().unwrap().push(limit);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(LikedPage::default()))
        }
    }

    /// Never answers
    struct HangingClient;

    #[async_trait]
    impl LikedTracksClient for HangingClient {
        fn platform(&self) -> Platform {
            Platform::Spotify
        }

        async fn fetch_liked_tracks(&self, _limit: usize, _cursor: Option<&str>) -> sources::Result<LikedPage> {
            std::future::pending().await
        }
    }

    fn page(items: &[(&str, &str)], next: Option<&str>) -> sources::Result<LikedPage> {
        Ok(LikedPage {
            tracks: items.iter().map(|(a, t)| RawTrack::new(*a, *t)).collect(),
            next_cursor: next.map(String::from),
        })
    }

    fn settings() -> FilterSettings {
        FilterSettings {
            retry: RetryPolicy::new(3, Duration::from_millis(10)),
            ..FilterSettings::default()
        }
    }

    #[tokio::test]
    async fn test_walks_all_pages() {
        let client = ScriptedClient::new(
            Platform::SoundCloud,
            vec![
                page(&[("A", "One"), ("B", "Two")], Some("p2")),
                page(&[("C", "Three")], None),
            ],
        );
        let calls = client.calls.clone();
        let aggregator = PlatformAggregator::new(Box::new(client), &settings());

        let favorites = aggregator.fetch_favorites().await;
        assert!(favorites.is_ok());
        assert_eq!(favorites.len(), 3);
        assert_eq!(favorites.platform, Platform::SoundCloud);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_respects_max_favorites() {
        let client = ScriptedClient::new(
            Platform::Spotify,
            vec![
                page(&[("A", "1"), ("B", "2"), ("C", "3")], Some("p2")),
                page(&[("D", "4"), ("E", "5"), ("F", "6")], Some("p3")),
            ],
        );
        let limits = client.limits.clone();
        let aggregator = PlatformAggregator::new(
            Box::new(client),
            &FilterSettings {
                max_favorites: 4,
                page_size: 3,
                ..settings()
            },
        );

        let favorites = aggregator.fetch_favorites().await;
        assert_eq!(favorites.len(), 4);
        assert_eq!(*limits.lock().unwrap(), vec![3, 1]);
    }

    #[tokio::test]
    async fn test_skips_blank_items() {
        let client = ScriptedClient::new(
            Platform::SoundCloud,
            vec![page(&[("A", "One"), ("", "No Artist"), ("B", "  ")], None)],
        );
        let aggregator = PlatformAggregator::new(Box::new(client), &settings());

        let favorites = aggregator.fetch_favorites().await;
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites.fetched, 3);
        assert_eq!(favorites.skipped, 2);
    }

    #[tokio::test]
    async fn test_memoizes_until_cleared() {
        let client = ScriptedClient::new(Platform::Spotify, vec![page(&[("A", "One")], None)]);
        let calls = client.calls.clone();
        let mut aggregator = PlatformAggregator::new(Box::new(client), &settings());

        aggregator.fetch_favorites().await;
        aggregator.fetch_favorites().await;
        assert!(aggregator.is_cached());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        aggregator.clear_cache();
        assert!(!aggregator.is_cached());
        aggregator.fetch_favorites().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_auth_error_yields_empty_set() {
        let client = ScriptedClient::new(
            Platform::Spotify,
            vec![Err(SourceError::authentication(Platform::Spotify, "HTTP 401"))],
        );
        let calls = client.calls.clone();
        let aggregator = PlatformAggregator::new(Box::new(client), &settings());

        let favorites = aggregator.fetch_favorites().await;
        assert!(favorites.is_empty());
        assert!(favorites.error.unwrap().contains("HTTP 401"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_is_retried() {
        let client = ScriptedClient::new(
            Platform::SoundCloud,
            vec![
                Err(SourceError::transient(Platform::SoundCloud, "HTTP 503")),
                page(&[("A", "One")], None),
            ],
        );
        let calls = client.calls.clone();
        let aggregator = PlatformAggregator::new(Box::new(client), &settings());

        let favorites = aggregator.fetch_favorites().await;
        assert!(favorites.is_ok());
        assert_eq!(favorites.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_mid_pagination_discards_partial_set() {
        let client = ScriptedClient::new(
            Platform::SoundCloud,
            vec![
                page(&[("A", "One")], Some("p2")),
                Err(SourceError::transient(Platform::SoundCloud, "HTTP 500")),
                Err(SourceError::transient(Platform::SoundCloud, "HTTP 500")),
                Err(SourceError::transient(Platform::SoundCloud, "HTTP 500")),
            ],
        );
        let aggregator = PlatformAggregator::new(Box::new(client), &settings());

        let favorites = aggregator.fetch_favorites().await;
        assert!(favorites.is_empty());
        let error = favorites.error.unwrap();
        assert!(error.contains("HTTP 500"));
        assert!(error.contains("gave up after 3 attempts"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_transient() {
        let aggregator = PlatformAggregator::new(
            Box::new(HangingClient),
            &FilterSettings {
                fetch_timeout_secs: 5,
                ..settings()
            },
        )
        .with_retry(RetryPolicy::none());

        let favorites = aggregator.fetch_favorites().await;
        assert!(favorites.is_empty());
        assert!(favorites.error.unwrap().contains("no response within"));
    }

    #[tokio::test]
    async fn test_page_cap() {
        struct EndlessClient;

        #[async_trait]
        impl LikedTracksClient for EndlessClient {
            fn platform(&self) -> Platform {
                Platform::SoundCloud
            }

            async fn fetch_liked_tracks(&self, _limit: usize, _cursor: Option<&str>) -> sources::Result<LikedPage> {
                Ok(LikedPage {
                    tracks: vec![],
                    next_cursor: Some("again".into()),
                })
            }
        }

        let aggregator = PlatformAggregator::new(Box::new(EndlessClient), &settings());
        let favorites = aggregator.fetch_favorites().await;
        assert!(favorites.is_ok());
        assert!(favorites.is_empty());
    }
}
