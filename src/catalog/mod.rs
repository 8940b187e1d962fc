pub mod client;
pub mod models;

pub use client::{CatalogClient, DEFAULT_API_BASE};
pub use models::{AlbumImage, Playlist, PlaylistTrackEntry, TimeRange, Track};
