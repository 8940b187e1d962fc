use std::collections::HashSet;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{CatalogClient, Playlist, TimeRange, Track};
use crate::error::{AppError, Result};

pub const MERGED_PLAYLIST_NAME: &str = "Queued Playlists";

const TOP_TRACKS_EXPORT_LIMIT: u32 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    pub playlist_id: String,
    pub playlist_name: String,
    pub source_playlists: Vec<String>,
    pub total_entries: usize,
    pub unique_tracks: usize,
}

/// Builds a throwaway queue out of the given playlists: creates a new
/// playlist holding the union of their tracks (first occurrence wins),
/// starts shuffled playback of it, then unfollows it so it does not
/// linger in the library.
pub async fn merge_playlists(
    client: &CatalogClient,
    selection: &[Playlist],
) -> Result<MergeReport> {
    if selection.is_empty() {
        return Err(AppError::Config("no playlists selected to merge".into()));
    }

    let mut seen = HashSet::new();
    let mut tracks: Vec<Track> = Vec::new();
    let mut total_entries = 0;

    for playlist in selection {
        let entries = client.get_playlist_tracks(&playlist.id).await?;
        total_entries += entries.len();
        for entry in entries {
            if seen.insert(entry.track.id.clone()) {
                tracks.push(entry.track);
            }
        }
    }

    let queue = client
        .create_playlist(MERGED_PLAYLIST_NAME, &merge_description(selection))
        .await?;

    let uris: Vec<String> = tracks.iter().map(|t| t.uri.clone()).collect();
    client.add_tracks_to_playlist(&queue.id, &uris).await?;

    client.play_context(&queue.context_uri()).await?;
    client.set_shuffle(true).await?;
    client.unfollow_playlist(&queue.id).await?;

    info!(
        "Queued {} unique tracks from {} playlists",
        tracks.len(),
        selection.len()
    );

    Ok(MergeReport {
        playlist_id: queue.id,
        playlist_name: queue.name,
        source_playlists: selection.iter().map(|p| p.name.clone()).collect(),
        total_entries,
        unique_tracks: tracks.len(),
    })
}

/// Add one track to an existing playlist.
pub async fn add_to_playlist(
    client: &CatalogClient,
    playlist_id: &str,
    track_uri: &str,
) -> Result<()> {
    client
        .add_tracks_to_playlist(playlist_id, &[track_uri.to_string()])
        .await?;
    Ok(())
}

/// Snapshot the listener's short-term top tracks into a playlist named
/// after the month that just ended.
pub async fn export_top_tracks(client: &CatalogClient) -> Result<Playlist> {
    let tracks = client
        .get_top_tracks(TimeRange::ShortTerm, TOP_TRACKS_EXPORT_LIMIT)
        .await?;

    let name = export_playlist_name(Local::now().date_naive());
    let playlist = client
        .create_playlist(&name, "Generated with spotidash")
        .await?;

    let uris: Vec<String> = tracks.iter().map(|t| t.uri.clone()).collect();
    client.add_tracks_to_playlist(&playlist.id, &uris).await?;

    info!("Exported {} top tracks to {}", tracks.len(), name);
    Ok(playlist)
}

fn merge_description(selection: &[Playlist]) -> String {
    format!(
        "Queue of following playlists:{}",
        selection
            .iter()
            .map(|p| format!(" \"{}\"", p.name))
            .collect::<Vec<_>>()
            .join(",")
    )
}

// The export runs just after a month ends, so it is named for the
// previous month but the current year.
fn export_playlist_name(today: NaiveDate) -> String {
    let last_month = today
        .with_day(1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(today);

    format!(
        "Your Top Songs {} {}",
        last_month.format("%B"),
        today.format("%Y")
    )
}
