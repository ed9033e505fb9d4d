//! Platform filtering for tag-based track recommendations.
//!
//! This crate provides:
//! - Normalization of artist/title strings into comparison keys
//! - A two-tier (exact, then fuzzy) matcher
//! - Per-platform favorites aggregation with pagination, retry and caching
//! - The FilterEngine that removes already-liked candidates
//!
//! ## Architecture
//! Candidates flow through the engine in stages:
//! 1. Aggregators fetch each enabled platform's liked tracks concurrently
//! 2. Favorites are normalized once into a reference list
//! 3. Candidates are normalized and matched against it in parallel
//! 4. Matches are removed and attributed to the platform they came from
//!
//! Nothing in here returns an error to the caller: a platform that can't be
//! reached contributes an entry to `FilterResult::errors` and removes nothing.
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{FilterConfig, FilterEngine, PlatformConfig};
//!
//! let engine = FilterEngine::new(Arc::new(HttpClientFactory::new(timeout)?));
//! let config = FilterConfig::default()
//!     .with_platform(PlatformConfig::new(Platform::SoundCloud, credentials));
//!
//! let result = engine.filter_tracks(candidates, &config).await;
//! println!("{}", result);
//! ```

pub mod aggregator;
pub mod config;
pub mod filter_engine;
pub mod matcher;
pub mod normalize;
pub mod result;
pub mod retry;
pub mod traits;

// Re-export main types
pub use aggregator::{Favorites, PlatformAggregator};
pub use config::{FilterConfig, FilterSettings, PlatformConfig};
pub use filter_engine::{FilterEngine, filter_with_sources};
pub use matcher::{MatchKind, Matcher};
pub use normalize::{NormalizedKey, normalize};
pub use result::{FilterResult, FilterStatistics};
pub use retry::RetryPolicy;
pub use traits::FavoritesSource;
