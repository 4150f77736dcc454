use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils;

/// Sentinel stored wherever a lookup could not produce a value.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Absolute expiry in epoch milliseconds.
    pub expires_at: i64,
}

/// Body returned by the token endpoint for both the authorization-code and the
/// refresh-token grants. `refresh_token` is frequently omitted on refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentlyPlayingResponse {
    #[serde(default)]
    pub is_playing: bool,
    pub item: Option<TrackItem>,
    pub context: Option<PlaybackContext>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackItem {
    pub name: String,
    #[serde(default)]
    pub album: AlbumInfo,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub popularity: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlbumInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackContext {
    #[serde(rename = "type")]
    pub kind: String,
    pub href: Option<String>,
}

impl PlaybackContext {
    pub fn playlist_href(&self) -> Option<&str> {
        if self.kind == "playlist" {
            self.href.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub is_active: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistResponse {
    pub name: Option<String>,
}

/// The triple that decides whether two snapshots belong to the same session.
/// Compared with exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackIdentity {
    pub song: String,
    pub artist: String,
    pub album: String,
}

impl fmt::Display for TrackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {} ({})", self.song, self.artist, self.album)
    }
}

/// One tick's observation of the provider's playback state.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    pub song: String,
    pub album: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
    pub release_date: Option<String>,
    pub played_at: DateTime<Utc>,
    pub is_playing: bool,
    pub album_cover_url: Option<String>,
    pub song_uri: String,
    pub popularity: u32,
    pub context: Option<PlaybackContext>,
    pub playlist_name: String,
    /// A follow-up request made while building this snapshot was answered
    /// with 429. No further provider calls may be made on the same tick.
    pub rate_limited: bool,
}

impl TrackSnapshot {
    /// Artist names joined the way they are stored and compared.
    pub fn artist(&self) -> String {
        utils::join_artists(&self.artists)
    }

    pub fn identity(&self) -> TrackIdentity {
        TrackIdentity {
            song: self.song.clone(),
            artist: self.artist(),
            album: self.album.clone(),
        }
    }
}

impl CurrentlyPlayingResponse {
    /// Converts the wire response into a snapshot. Returns `None` when nothing
    /// is loaded in the player. The playlist name starts out as [`UNKNOWN`].
    pub fn into_snapshot(self, played_at: DateTime<Utc>) -> Option<TrackSnapshot> {
        let item = self.item?;
        let album_cover_url = item.album.images.first().map(|image| image.url.clone());

        Some(TrackSnapshot {
            song: item.name,
            album: item.album.name,
            artists: item.artists.into_iter().map(|a| a.name).collect(),
            duration_ms: item.duration_ms,
            release_date: item.album.release_date,
            played_at,
            is_playing: self.is_playing,
            album_cover_url,
            song_uri: item.uri,
            popularity: item.popularity,
            context: self.context,
            playlist_name: UNKNOWN.to_string(),
            rate_limited: false,
        })
    }
}

/// Everything written to the `playbacks` table for one finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRecord {
    pub song: String,
    pub album: String,
    pub artist: String,
    pub genres: Vec<String>,
    pub duration_ms: u64,
    pub seconds_played: u32,
    pub played_at: DateTime<Utc>,
    pub album_cover_url: Option<String>,
    pub song_uri: String,
    pub popularity: u32,
    pub playback_device: String,
    pub release_date: Option<String>,
    pub playlist_name: String,
}

impl PlaybackRecord {
    /// Individual artist names for the `artists` aggregate table.
    pub fn artist_names(&self) -> Vec<String> {
        utils::split_artists(&self.artist)
    }
}
