use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::catalog::{Playlist, PlaylistTrackEntry};

/// Everything one sync pass pulls down from the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSnapshot {
    /// Every playlist on the user's library page, editable or not.
    pub playlists: Vec<Playlist>,
    /// Track listings, fetched only for playlists the user owns or
    /// collaborates on.
    pub playlists_and_tracks: Vec<PlaylistTracks>,
    pub liked_tracks: Vec<PlaylistTrackEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTracks {
    pub playlist: Playlist,
    pub entries: Vec<PlaylistTrackEntry>,
}

/// Shared handle to the library snapshot. Any number of readers may hold
/// a clone; only the sync pass writes. Each field is replaced wholesale
/// when its fetch completes, so readers never observe a half-written
/// field, only data from the previous pass.
#[derive(Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<SyncSnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone out the current snapshot.
    pub fn snapshot(&self) -> SyncSnapshot {
        self.inner.read().unwrap().clone()
    }

    /// Run a closure against the snapshot without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&SyncSnapshot) -> R) -> R {
        f(&self.inner.read().unwrap())
    }

    /// Drop all synced data, for when the session ends.
    pub fn clear(&self) {
        *self.inner.write().unwrap() = SyncSnapshot::default();
    }

    pub(crate) fn replace_playlists(&self, playlists: Vec<Playlist>) {
        self.inner.write().unwrap().playlists = playlists;
    }

    pub(crate) fn replace_playlist_tracks(&self, playlist_tracks: Vec<PlaylistTracks>) {
        self.inner.write().unwrap().playlists_and_tracks = playlist_tracks;
    }

    pub(crate) fn replace_liked_tracks(&self, liked_tracks: Vec<PlaylistTrackEntry>) {
        self.inner.write().unwrap().liked_tracks = liked_tracks;
    }
}
