use std::{sync::Mutex, time::Duration};

use super::{SpotifyClient, UNAUTHORIZED_RETRIES};
use crate::{
    error::{Error, Result},
    info,
    types::{PlaylistResponse, UNKNOWN},
    warning,
};

/// Minimum gap between two playlist lookups.
pub const PLAYLIST_LOOKUP_INTERVAL: Duration = Duration::from_millis(5000);

/// Debounce shared by every playlist lookup of one client, whatever playlist
/// is being asked for. An attempt counts as a lookup even if it fails.
#[derive(Debug)]
pub struct PlaylistThrottle {
    interval_ms: i64,
    last_lookup_ms: Mutex<Option<i64>>,
}

impl PlaylistThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as i64,
            last_lookup_ms: Mutex::new(None),
        }
    }

    /// Claims the next lookup slot. Returns `false` while the previous lookup
    /// is less than the interval ago.
    pub fn try_acquire(&self, now_ms: i64) -> bool {
        let mut last = self
            .last_lookup_ms
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match *last {
            Some(previous) if now_ms - previous < self.interval_ms => false,
            _ => {
                *last = Some(now_ms);
                true
            }
        }
    }
}

impl SpotifyClient {
    /// Name of the playlist behind `href`, or `"Unknown"` when debounced or on
    /// any failure except a rate limit.
    ///
    /// # Errors
    ///
    /// [`Error::RateLimited`] is passed through so the caller can stop making
    /// requests for the rest of the tick.
    pub async fn playlist_name(&self, href: &str) -> Result<String> {
        if !self.playlist_throttle.try_acquire(self.clock.now_millis()) {
            info!("Skipping playlist fetch to prevent too many requests.");
            return Ok(UNKNOWN.to_string());
        }

        match self.fetch_playlist(href).await {
            Ok(playlist) => Ok(playlist
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string())),
            Err(Error::RateLimited) => Err(Error::RateLimited),
            Err(e) => {
                warning!("Error fetching playlist name: {}", e);
                Ok(UNKNOWN.to_string())
            }
        }
    }

    async fn fetch_playlist(&self, href: &str) -> Result<PlaylistResponse> {
        let response = self.authorized_get(href, UNAUTHORIZED_RETRIES).await?;
        Ok(response.json::<PlaylistResponse>().await?)
    }
}
