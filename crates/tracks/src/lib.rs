//! # Tracks Crate
//!
//! Domain types shared across the workspace.
//!
//! ## Main Components
//!
//! - **types**: `Platform` and the immutable `Track` record
//! - **error**: `TrackError` for precondition violations
//!
//! ## Example Usage
//!
//! ```ignore
//! use tracks::{Platform, Track};
//!
//! let track = Track::new("Daft Punk", "One More Time", Platform::LastFm)?
//!     .with_source_id("https://www.last.fm/music/Daft+Punk/_/One+More+Time");
//!
//! println!("{} ({})", track, track.platform_origin());
//! ```

// Public modules
pub mod error;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{Result, TrackError};
pub use types::{Platform, Track};
