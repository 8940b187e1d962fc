use chrono::{DateTime, Utc};

use crate::catalog::{Playlist, PlaylistTrackEntry, Track};
use crate::resolver::is_same_track;
use crate::sync::SyncSnapshot;

pub const LIKED_SONGS_LABEL: &str = "Liked Songs";

/// A playlist row flattened out with the name of the list it came from.
#[derive(Debug, Clone)]
pub struct AddedTrack {
    pub playlist_name: String,
    pub track: Track,
    pub added_at: DateTime<Utc>,
}

/// Every entry across the user's playlists and liked tracks, newest
/// additions first. Entries with equal timestamps keep their original
/// order.
pub fn recently_added(snapshot: &SyncSnapshot) -> Vec<AddedTrack> {
    let mut entries: Vec<AddedTrack> = snapshot
        .playlists_and_tracks
        .iter()
        .flat_map(|pt| {
            pt.entries.iter().map(|entry| AddedTrack {
                playlist_name: pt.playlist.name.clone(),
                track: entry.track.clone(),
                added_at: entry.added_at,
            })
        })
        .collect();

    entries.extend(snapshot.liked_tracks.iter().map(|entry| AddedTrack {
        playlist_name: LIKED_SONGS_LABEL.to_string(),
        track: entry.track.clone(),
        added_at: entry.added_at,
    }));

    entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));
    entries
}

/// Liked tracks that sit in none of the user's playlists. Uses track
/// identity rather than raw ids, so a filed regional variant counts.
pub fn liked_unfiled(snapshot: &SyncSnapshot) -> Vec<PlaylistTrackEntry> {
    snapshot
        .liked_tracks
        .iter()
        .filter(|liked| {
            !snapshot.playlists_and_tracks.iter().any(|pt| {
                pt.entries
                    .iter()
                    .any(|entry| is_same_track(&liked.track, &entry.track))
            })
        })
        .cloned()
        .collect()
}

/// The playlists whose track listing contains the target song.
pub fn playlists_containing<'a>(snapshot: &'a SyncSnapshot, target: &Track) -> Vec<&'a Playlist> {
    snapshot
        .playlists_and_tracks
        .iter()
        .filter(|pt| {
            pt.entries
                .iter()
                .any(|entry| is_same_track(&entry.track, target))
        })
        .map(|pt| &pt.playlist)
        .collect()
}
