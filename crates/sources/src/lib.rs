//! # Sources Crate
//!
//! This crate implements the external collaborators of the filtering core.
//!
//! ## Components
//!
//! ### Recommendation source
//! - **lastfm**: `tag.gettoptracks`, candidate tracks for a tag
//!
//! ### Favorites platforms
//! - **soundcloud**: the user's likes, cursor-paginated via `next_href`;
//!   also a `PlaylistTarget` (track search, playlist create/append)
//! - **spotify**: the user's saved tracks, cursor-paginated via `next`
//!
//! ### Seams
//! - **traits**: `LikedTracksClient`, `TagSource`, `ClientFactory`, `PlaylistTarget`
//! - **error**: `SourceError` (authentication / transient / configuration / invalid response)
//!
//! ## Example Usage
//!
//! ```ignore
//! use sources::{ClientFactory, Credentials, HttpClientFactory};
//! use std::time::Duration;
//! use tracks::Platform;
//!
//! let factory = HttpClientFactory::new(Duration::from_secs(30))?;
//! let creds = Credentials::new().with("oauth_token", token);
//! let client = factory.build(Platform::SoundCloud, &creds)?;
//!
//! let first_page = client.fetch_liked_tracks(50, None).await?;
//! ```

// Public modules
pub mod error;
pub mod factory;
pub mod lastfm;
pub mod soundcloud;
pub mod spotify;
pub mod traits;
pub mod types;

mod http;

// Re-export commonly used types
pub use error::{Result, SourceError};
pub use factory::HttpClientFactory;
pub use lastfm::LastFmClient;
pub use soundcloud::SoundCloudClient;
pub use spotify::SpotifyClient;
pub use traits::{ClientFactory, LikedTracksClient, PlaylistTarget, TagSource};
pub use types::{Credentials, LikedPage, RawTrack, RemotePlaylist, RemoteTrack};
