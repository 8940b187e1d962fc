use futures::future::join_all;
use std::sync::Mutex;
use tokio::sync::Semaphore;
use tracing::info;

use crate::catalog::{CatalogClient, Playlist};
use crate::error::{AppError, Result};
use crate::sync::snapshot::{PlaylistTracks, SnapshotStore, SyncSnapshot};

/// How many playlist track listings are fetched at once.
pub const DEFAULT_CONCURRENT_FETCHES: usize = 8;

pub struct SyncOrchestrator {
    client: CatalogClient,
    store: SnapshotStore,
    max_concurrent_fetches: usize,
}

impl SyncOrchestrator {
    pub fn new(client: CatalogClient, store: SnapshotStore) -> Self {
        Self {
            client,
            store,
            max_concurrent_fetches: DEFAULT_CONCURRENT_FETCHES,
        }
    }

    pub fn with_concurrency(mut self, max_concurrent_fetches: usize) -> Self {
        self.max_concurrent_fetches = max_concurrent_fetches.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// One full library pass: playlists first, then the track listing of
    /// every owned-or-collaborative playlist, then liked tracks. Each
    /// stage is published to the store as it completes. `on_progress`
    /// receives one "Loaded k of n playlists" message per finished track
    /// fetch, in completion order.
    ///
    /// Any failed fetch fails the whole pass; stages already published
    /// stay in the store, the failed stage keeps its previous data.
    pub async fn sync<F>(&self, on_progress: F) -> Result<SyncSnapshot>
    where
        F: Fn(&str) + Send + Sync,
    {
        info!("Starting library sync");

        let playlists = self.client.get_user_playlists().await?;
        self.store.replace_playlists(playlists.clone());

        let owned: Vec<Playlist> = playlists
            .into_iter()
            .filter(|p| p.collaborative || p.owner_id == self.client.user_id())
            .collect();
        let total = owned.len();

        info!("Fetching tracks for {} editable playlists", total);

        let semaphore = Semaphore::new(self.max_concurrent_fetches);
        let completed = Mutex::new(0usize);

        let fetches = owned.iter().map(|playlist| {
            let client = &self.client;
            let semaphore = &semaphore;
            let completed = &completed;
            let on_progress = &on_progress;

            async move {
                let _permit = semaphore.acquire().await.unwrap();
                let entries = client.get_playlist_tracks(&playlist.id).await?;

                {
                    let mut done = completed.lock().unwrap();
                    *done += 1;
                    on_progress(&format!("Loaded {} of {} playlists", *done, total));
                }

                Ok::<_, AppError>(PlaylistTracks {
                    playlist: playlist.clone(),
                    entries,
                })
            }
        });

        let results = join_all(fetches).await;
        let mut playlists_and_tracks = Vec::with_capacity(total);
        for result in results {
            playlists_and_tracks.push(result?);
        }
        self.store.replace_playlist_tracks(playlists_and_tracks);

        let liked_tracks = self.client.get_liked_tracks().await?;
        self.store.replace_liked_tracks(liked_tracks);

        info!("Library sync complete");
        Ok(self.store.snapshot())
    }
}
