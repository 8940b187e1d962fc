use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
    pub album_art: Vec<AlbumImage>,
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumImage {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub collaborative: bool,
    pub images: Vec<AlbumImage>,
}

impl Playlist {
    pub fn context_uri(&self) -> String {
        format!("spotify:playlist:{}", self.id)
    }
}

/// One row of a playlist (or of the liked-tracks collection): the track
/// plus the moment it was added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTrackEntry {
    pub track: Track,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

// Wire format. The API nests artists, albums and shows as objects; only
// the fields the app reads are declared, serde drops the rest.

#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    pub items: Vec<T>,
    pub total: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserDto {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistDto {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub collaborative: bool,
    #[serde(default)]
    pub images: Option<Vec<ImageDto>>,
    pub owner: OwnerDto,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnerDto {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageDto {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackDto {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistDto>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub album: Option<AlbumDto>,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArtistDto {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlbumDto {
    #[serde(default)]
    pub images: Vec<ImageDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EpisodeDto {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub images: Vec<ImageDto>,
    #[serde(default)]
    pub show: Option<ShowDto>,
    #[serde(default)]
    pub uri: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShowDto {
    pub name: String,
}

/// Playlists may hold podcast episodes next to tracks; the API tags each
/// item with its object type.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum PlayableItemDto {
    Track(TrackDto),
    Episode(EpisodeDto),
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistItemDto {
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub track: Option<PlayableItemDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponseDto {
    pub tracks: Page<TrackDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaybackDto {
    #[serde(default)]
    pub item: Option<PlayableItemDto>,
}

impl ImageDto {
    fn into_image(self) -> AlbumImage {
        AlbumImage {
            url: self.url,
            width: self.width,
            height: self.height,
        }
    }
}

impl TrackDto {
    pub(crate) fn into_track(self) -> Option<Track> {
        if self.is_local {
            debug!("Skipping local track: {}", self.name);
            return None;
        }
        let Some(id) = self.id else {
            debug!("Skipping track without id: {}", self.name);
            return None;
        };
        Some(Track {
            id,
            name: self.name,
            artists: self.artists.into_iter().map(|a| a.name).collect(),
            duration_ms: self.duration_ms,
            album_art: self
                .album
                .map(|a| a.images.into_iter().map(ImageDto::into_image).collect())
                .unwrap_or_default(),
            uri: self.uri,
        })
    }
}

impl EpisodeDto {
    // Episodes are folded into the track shape, with the show standing in
    // for the artist.
    pub(crate) fn into_track(self) -> Option<Track> {
        let Some(id) = self.id else {
            debug!("Skipping episode without id: {}", self.name);
            return None;
        };
        Some(Track {
            id,
            name: self.name,
            artists: self.show.map(|s| vec![s.name]).unwrap_or_default(),
            duration_ms: self.duration_ms,
            album_art: self.images.into_iter().map(ImageDto::into_image).collect(),
            uri: self.uri,
        })
    }
}

impl PlayableItemDto {
    pub(crate) fn into_track(self) -> Option<Track> {
        match self {
            PlayableItemDto::Track(track) => track.into_track(),
            PlayableItemDto::Episode(episode) => episode.into_track(),
        }
    }
}

impl PlaylistItemDto {
    pub(crate) fn into_entry(self) -> Option<PlaylistTrackEntry> {
        let track = self.track?.into_track()?;
        Some(PlaylistTrackEntry {
            track,
            added_at: self.added_at.unwrap_or(DateTime::UNIX_EPOCH),
        })
    }
}

impl PlaylistDto {
    pub(crate) fn into_playlist(self) -> Playlist {
        Playlist {
            id: self.id,
            name: self.name,
            owner_id: self.owner.id,
            collaborative: self.collaborative,
            images: self
                .images
                .map(|imgs| imgs.into_iter().map(ImageDto::into_image).collect())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
impl Track {
    pub fn mock(id: &str, name: &str, artist: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            artists: vec![artist.to_string()],
            duration_ms: 180000,
            album_art: Vec::new(),
            uri: format!("spotify:track:{id}"),
        }
    }
}

#[cfg(test)]
impl Playlist {
    pub fn mock(id: &str, name: &str, owner_id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            collaborative: false,
            images: Vec::new(),
        }
    }
}

#[cfg(test)]
impl PlaylistTrackEntry {
    pub fn mock(track: Track, added_at: &str) -> Self {
        Self {
            track,
            added_at: added_at.parse().unwrap(),
        }
    }
}
