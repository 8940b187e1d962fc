pub mod actions;
pub mod catalog;
pub mod config;
pub mod error;
pub mod resolver;
pub mod sync;
pub mod views;

pub use actions::MergeReport;
pub use catalog::{CatalogClient, Playlist, PlaylistTrackEntry, Track};
pub use config::Config;
pub use error::{AppError, Result};
pub use resolver::is_same_track;
pub use sync::{SnapshotStore, SyncOrchestrator, SyncSnapshot};
