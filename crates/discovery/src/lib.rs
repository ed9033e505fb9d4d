//! Discovery crate for the songs-enjoyer playlist generator.
//!
//! This crate contains the orchestrator that turns a handful of tags into
//! a daily playlist: candidates from the tag source, minus whatever the
//! user already likes on their streaming platforms. The importer pushes
//! the result to a platform playlist.

pub mod import;
pub mod orchestrator;

pub use import::{DEFAULT_PLAYLIST_TITLE, ImportReport, PlaylistImporter};
pub use orchestrator::{DailyPlaylist, PlaylistOrchestrator, merge_candidates, select_tracks};
