pub mod orchestrator;
pub mod snapshot;

pub use orchestrator::{DEFAULT_CONCURRENT_FETCHES, SyncOrchestrator};
pub use snapshot::{PlaylistTracks, SnapshotStore, SyncSnapshot};
