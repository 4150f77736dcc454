//! # Spotify Integration Module
//!
//! Request/response wrappers around the handful of Spotify Web API endpoints
//! spotlog needs, plus the OAuth token handling they depend on.
//!
//! ## Endpoints
//!
//! - `GET /me/player/currently-playing` - the snapshot consumed every tick
//! - `GET /me/player/devices` - resolved once when a session ends
//! - `GET <context.href>` - playlist name, debounced process-wide
//! - `POST /api/token` - authorization-code exchange and refresh
//!
//! ## Failure handling
//!
//! Every authorized request goes through [`SpotifyClient::authorized_get`]:
//!
//! - **401 Unauthorized**: the token is refreshed and the request is sent
//!   again, at most `retries` times (1 at every call site)
//! - **429 Too Many Requests**: [`Error::RateLimited`] is returned right away,
//!   nothing else is requested for that call
//! - **Anything else non-2xx**: [`Error::Http`]
//!
//! Callers higher up turn these into degraded values; nothing here retries on
//! its own beyond the single 401 refresh.

pub mod auth;
mod player;
mod playlist;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};

pub use auth::Authenticator;
pub use playlist::{PLAYLIST_LOOKUP_INTERVAL, PlaylistThrottle};

use crate::{
    error::{Error, Result},
    types::{TrackIdentity, TrackSnapshot},
    utils::Clock,
    warning,
};

/// How often a rejected token is refreshed and the request repeated.
pub const UNAUTHORIZED_RETRIES: u8 = 1;

/// What the session tracker needs from the streaming provider.
#[async_trait]
pub trait PlaybackProvider: Send + Sync {
    /// Fetches the currently playing track.
    ///
    /// `known` is the identity the caller is currently tracking; the playlist
    /// name is only looked up when the snapshot belongs to a different track.
    /// `Ok(None)` means nothing is loaded in the player.
    async fn current_track(&self, known: Option<&TrackIdentity>) -> Result<Option<TrackSnapshot>>;

    /// Type of the active playback device, `"Unknown"` on any failure.
    async fn playback_device(&self) -> String;
}

pub struct SpotifyClient {
    api_url: String,
    auth: Arc<Authenticator>,
    http: Client,
    clock: Arc<dyn Clock>,
    playlist_throttle: PlaylistThrottle,
}

impl SpotifyClient {
    pub fn new(api_url: impl Into<String>, auth: Arc<Authenticator>, clock: Arc<dyn Clock>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            auth,
            http,
            clock,
            playlist_throttle: PlaylistThrottle::new(PLAYLIST_LOOKUP_INTERVAL),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Sends an authorized GET request.
    ///
    /// A 401 triggers a token refresh followed by a repeat of the request with
    /// the refreshed token, at most `retries` times. Once the budget is spent a 401 is reported as
    /// [`Error::Http`].
    pub async fn authorized_get(&self, url: &str, retries: u8) -> Result<Response> {
        let mut retries_left = retries;
        let mut token = self.auth.access_token().await?;

        loop {
            let response = self.http.get(url).bearer_auth(&token).send().await?;

            match response.status() {
                StatusCode::UNAUTHORIZED if retries_left > 0 => {
                    retries_left -= 1;
                    warning!("Access token rejected. Refreshing and retrying...");
                    token = self.auth.refresh().await?;
                }
                StatusCode::TOO_MANY_REQUESTS => return Err(Error::RateLimited),
                status if !status.is_success() => return Err(Error::Http(status)),
                _ => return Ok(response),
            }
        }
    }
}

#[async_trait]
impl PlaybackProvider for SpotifyClient {
    async fn current_track(&self, known: Option<&TrackIdentity>) -> Result<Option<TrackSnapshot>> {
        SpotifyClient::current_track(self, known).await
    }

    async fn playback_device(&self) -> String {
        SpotifyClient::playback_device(self).await
    }
}
