use reqwest::StatusCode;

use super::{SpotifyClient, UNAUTHORIZED_RETRIES};
use crate::{
    error::{Error, Result},
    info,
    types::{CurrentlyPlayingResponse, DevicesResponse, TrackIdentity, TrackSnapshot, UNKNOWN},
    warning,
};

impl SpotifyClient {
    /// Retrieves what the user is listening to right now.
    ///
    /// Returns `Ok(None)` when nothing is playing (HTTP 204, an empty body or a
    /// response without `item`). The playlist name is resolved only when the
    /// snapshot is playing from a playlist and differs from `known`; otherwise
    /// it stays `"Unknown"`. A 429 on that lookup marks the snapshot as
    /// [`rate_limited`](TrackSnapshot::rate_limited).
    ///
    /// # Errors
    ///
    /// - [`Error::RateLimited`] on 429, without retrying
    /// - [`Error::Unauthenticated`] / [`Error::RefreshFailed`] from token handling
    /// - [`Error::Transport`] / [`Error::Http`] for everything else
    pub async fn current_track(&self, known: Option<&TrackIdentity>) -> Result<Option<TrackSnapshot>> {
        let url = self.endpoint("/me/player/currently-playing");
        let response = self.authorized_get(&url, UNAUTHORIZED_RETRIES).await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let payload: CurrentlyPlayingResponse =
            serde_json::from_str(&body).map_err(|e| Error::Transport(e.to_string()))?;

        let Some(mut snapshot) = payload.into_snapshot(self.clock.now()) else {
            return Ok(None);
        };

        let playlist_href = snapshot
            .context
            .as_ref()
            .and_then(|context| context.playlist_href())
            .map(str::to_string);

        if let Some(href) = playlist_href {
            if known != Some(&snapshot.identity()) {
                match self.playlist_name(&href).await {
                    Ok(name) => snapshot.playlist_name = name,
                    Err(_) => {
                        info!("Rate limit reached while fetching playlist name.");
                        snapshot.rate_limited = true;
                    }
                }
            }
        }

        Ok(Some(snapshot))
    }

    /// Type of the currently active device ("Computer", "Smartphone", ...).
    /// Any failure degrades to `"Unknown"`.
    pub async fn playback_device(&self) -> String {
        match self.fetch_devices().await {
            Ok(devices) => devices
                .devices
                .into_iter()
                .find(|device| device.is_active)
                .map(|device| device.kind)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            Err(e) => {
                warning!("Error fetching playback device: {}", e);
                UNKNOWN.to_string()
            }
        }
    }

    async fn fetch_devices(&self) -> Result<DevicesResponse> {
        let url = self.endpoint("/me/player/devices");
        let response = self.authorized_get(&url, UNAUTHORIZED_RETRIES).await?;
        Ok(response.json::<DevicesResponse>().await?)
    }
}
