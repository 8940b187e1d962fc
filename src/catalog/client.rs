use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::catalog::models::{
    Page, Playlist, PlaylistDto, PlaylistItemDto, PlaylistTrackEntry, PlaybackDto,
    PlayableItemDto, SearchResponseDto, TimeRange, Track, TrackDto, UserDto,
};
use crate::config::Config;
use crate::error::{AppError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";

const PLAYLIST_PAGE_SIZE: u32 = 50;
const TRACK_PAGE_SIZE: u32 = 100;
const LIKED_PAGE_SIZE: u32 = 50;

// The add-tracks endpoint rejects larger batches.
const ADD_TRACKS_CHUNK_SIZE: usize = 99;

// Used when a 429 arrives without a Retry-After header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

#[derive(Clone)]
pub struct CatalogClient {
    http_client: Client,
    access_token: String,
    api_base: String,
    user_id: String,
}

impl CatalogClient {
    pub async fn new(config: &Config) -> Result<Self> {
        let client = Self {
            http_client: Client::new(),
            access_token: config.access_token.clone(),
            api_base: config.api_base.clone(),
            user_id: String::new(),
        };

        let user: UserDto = client.get_json("/me", &[]).await?;
        let display_name = user.display_name.unwrap_or_else(|| user.id.clone());
        info!("Authenticated as Spotify user: {}", display_name);

        Ok(Self {
            user_id: user.id,
            ..client
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Parse a Spotify track URL and extract the track ID.
    /// Supports formats:
    /// - https://open.spotify.com/track/11dFghVXANMlKmJXsNCbNl
    /// - https://open.spotify.com/track/11dFghVXANMlKmJXsNCbNl?si=...
    /// - spotify:track:11dFghVXANMlKmJXsNCbNl
    pub fn parse_track_url(url_str: &str) -> Result<String> {
        // Handle Spotify URI format
        if url_str.starts_with("spotify:track:") {
            return Ok(url_str.replace("spotify:track:", ""));
        }

        // Handle URL format
        let url =
            Url::parse(url_str).map_err(|e| AppError::Config(format!("Invalid URL: {}", e)))?;

        let path_segments: Vec<&str> = url
            .path_segments()
            .ok_or_else(|| AppError::Config("Invalid Spotify URL".into()))?
            .collect();

        // Expect /track/{id}
        if path_segments.len() >= 2 && path_segments[0] == "track" {
            Ok(path_segments[1].to_string())
        } else {
            Err(AppError::Config(
                "URL does not appear to be a Spotify track URL".into(),
            ))
        }
    }

    /// Every playlist on the user's library page, including followed ones
    /// the user cannot edit.
    pub async fn get_user_playlists(&self) -> Result<Vec<Playlist>> {
        let path = format!("/users/{}/playlists", self.user_id);
        let dtos: Vec<PlaylistDto> = self.fetch_all(&path, PLAYLIST_PAGE_SIZE).await?;
        let playlists: Vec<Playlist> = dtos.into_iter().map(PlaylistDto::into_playlist).collect();

        info!("Found {} playlists", playlists.len());
        Ok(playlists)
    }

    pub async fn get_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<PlaylistTrackEntry>> {
        let path = format!("/playlists/{}/tracks", playlist_id);
        let items: Vec<PlaylistItemDto> = self.fetch_all(&path, TRACK_PAGE_SIZE).await?;

        Ok(items
            .into_iter()
            .filter_map(PlaylistItemDto::into_entry)
            .collect())
    }

    pub async fn get_liked_tracks(&self) -> Result<Vec<PlaylistTrackEntry>> {
        let items: Vec<PlaylistItemDto> = self.fetch_all("/me/tracks", LIKED_PAGE_SIZE).await?;
        let liked: Vec<PlaylistTrackEntry> = items
            .into_iter()
            .filter_map(PlaylistItemDto::into_entry)
            .collect();

        info!("Fetched {} liked tracks", liked.len());
        Ok(liked)
    }

    pub async fn get_top_tracks(&self, time_range: TimeRange, limit: u32) -> Result<Vec<Track>> {
        let query = [
            ("time_range", time_range.as_str().to_string()),
            ("limit", limit.to_string()),
            ("offset", "0".to_string()),
        ];
        let page: Page<TrackDto> = self.get_json("/me/top/tracks", &query).await?;

        Ok(page
            .items
            .into_iter()
            .filter_map(TrackDto::into_track)
            .collect())
    }

    pub async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<Track>> {
        let params = [
            ("q", query.to_string()),
            ("type", "track".to_string()),
            ("limit", limit.to_string()),
        ];
        let response: SearchResponseDto = self.get_json("/search", &params).await?;

        Ok(response
            .tracks
            .items
            .into_iter()
            .filter_map(TrackDto::into_track)
            .collect())
    }

    pub async fn get_track(&self, track_id: &str) -> Result<Track> {
        let path = format!("/tracks/{}", track_id);
        let dto: TrackDto = self.get_json(&path, &[]).await?;

        dto.into_track()
            .ok_or_else(|| AppError::NotFound(format!("track {} is not playable", track_id)))
    }

    /// Whatever is playing right now, if anything is.
    pub async fn get_current_track(&self) -> Result<Option<Track>> {
        let response = self.get("/me/player", &[]).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let playback: PlaybackDto = response.json().await?;
        Ok(playback.item.and_then(PlayableItemDto::into_track))
    }

    pub async fn create_playlist(&self, name: &str, description: &str) -> Result<Playlist> {
        let url = format!("{}/users/{}/playlists", self.api_base, self.user_id);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "name": name, "description": description }))
            .send()
            .await?;
        let response = check_status(response).await?;

        let dto: PlaylistDto = response.json().await?;
        info!("Created playlist: {}", name);
        Ok(dto.into_playlist())
    }

    /// Appends tracks in the order given, splitting into chunks the API
    /// accepts. Local-file URIs cannot be added over the API and are
    /// dropped. Returns how many URIs were sent.
    pub async fn add_tracks_to_playlist(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<usize> {
        let playable: Vec<&String> = uris.iter().filter(|uri| !uri.contains(":local:")).collect();
        if playable.is_empty() {
            return Ok(0);
        }

        let url = format!("{}/playlists/{}/tracks", self.api_base, playlist_id);
        for chunk in playable.chunks(ADD_TRACKS_CHUNK_SIZE) {
            let response = self
                .http_client
                .post(&url)
                .bearer_auth(&self.access_token)
                .json(&serde_json::json!({ "uris": chunk }))
                .send()
                .await?;
            check_status(response).await?;
        }

        info!("Added {} tracks to playlist", playable.len());
        Ok(playable.len())
    }

    pub async fn play_context(&self, context_uri: &str) -> Result<()> {
        let url = format!("{}/me/player/play", self.api_base);

        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "context_uri": context_uri }))
            .send()
            .await?;
        check_status(response).await?;

        Ok(())
    }

    pub async fn play_track(&self, track_uri: &str) -> Result<()> {
        let url = format!("{}/me/player/play", self.api_base);

        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "uris": [track_uri] }))
            .send()
            .await?;
        check_status(response).await?;

        Ok(())
    }

    pub async fn set_shuffle(&self, state: bool) -> Result<()> {
        let url = format!("{}/me/player/shuffle", self.api_base);

        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&self.access_token)
            .query(&[("state", state.to_string())])
            .send()
            .await?;
        check_status(response).await?;

        Ok(())
    }

    pub async fn unfollow_playlist(&self, playlist_id: &str) -> Result<()> {
        let url = format!("{}/playlists/{}/followers", self.api_base, playlist_id);

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        check_status(response).await?;

        debug!("Unfollowed playlist {}", playlist_id);
        Ok(())
    }

    /// Walks a paginated endpoint from offset 0 until every announced item
    /// has been collected. Rate limiting is absorbed per request: a 429
    /// sleeps for the server-given delay and the same offset is retried,
    /// so callers see either the complete collection or an error.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        page_size: u32,
    ) -> Result<Vec<T>> {
        let page_size = page_size.max(1);
        let mut items: Vec<T> = Vec::new();
        let mut offset = 0;

        loop {
            let page: Page<T> = self.fetch_page(path, offset, page_size).await?;
            let total = page.total as usize;
            let fetched = page.items.len();
            items.extend(page.items);

            debug!("Fetched {}/{} items from {}", items.len(), total, path);

            if items.len() >= total || fetched == 0 {
                break;
            }
            offset += page_size;
        }

        Ok(items)
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        path: &str,
        offset: u32,
        page_size: u32,
    ) -> Result<Page<T>> {
        let query = [
            ("limit", page_size.to_string()),
            ("offset", offset.to_string()),
        ];
        self.get_json(path, &query).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.get(path, query).await?;
        Ok(response.json().await?)
    }

    // Shared GET path. Loops on 429 so every read sees the same backoff
    // behavior; mutations do not retry.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.api_base, path);

        loop {
            let response = self
                .http_client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(query)
                .send()
                .await?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                let delay = retry_after(&response);
                warn!(
                    "Rate limited on {}, retrying in {}s",
                    path,
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return check_status(response).await;
        }
    }
}

fn retry_after(response: &reqwest::Response) -> Duration {
    let secs = response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
    Duration::from_secs(secs)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let error_text = response.text().await.unwrap_or_default();
        return Err(AppError::Auth(format!(
            "access token rejected: {}",
            error_text
        )));
    }

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(AppError::Api {
            status: status.as_u16(),
            message: error_text,
        });
    }

    Ok(response)
}
