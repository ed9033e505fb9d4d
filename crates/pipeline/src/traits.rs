//! Core traits for the filtering engine.
//!
//! This module defines the FavoritesSource trait that lets the engine
//! consume a user's liked tracks without knowing how they were fetched.

use crate::aggregator::Favorites;
use async_trait::async_trait;
use tracks::Platform;

/// A user's favorites on one platform.
///
/// ## Design Note
/// - `Send + Sync` so sources can be fetched from spawned tasks
/// - `fetch_favorites` never fails: problems are reported through
///   `Favorites::error` and the set is empty, which removes nothing
/// - Implementations memoize, so calling twice in one session costs one fetch
#[async_trait]
pub trait FavoritesSource: Send + Sync {
    /// Platform the favorites are attributed to
    fn platform(&self) -> Platform;

    /// Complete favorites set, or an empty set with an error description
    async fn fetch_favorites(&self) -> Favorites;
}
