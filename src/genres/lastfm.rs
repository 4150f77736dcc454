use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::GenreSource;
use crate::error::{Error, Result};

/// Last.fm answers "track not found" with a 200 and this error code.
const TRACK_NOT_FOUND: u32 = 6;

pub struct LastFmClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl LastFmClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TrackInfoResponse {
    track: Option<TrackInfo>,
    error: Option<u32>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackInfo {
    #[serde(default)]
    toptags: Option<TopTags>,
}

#[derive(Debug, Deserialize)]
struct TopTags {
    #[serde(default)]
    tag: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

fn tag_names(response: TrackInfoResponse) -> Result<Vec<String>> {
    match response.error {
        Some(TRACK_NOT_FOUND) => return Ok(Vec::new()),
        Some(code) => {
            return Err(Error::Transport(format!(
                "Last.fm error {code}: {}",
                response.message.unwrap_or_default()
            )));
        }
        None => {}
    }

    Ok(response
        .track
        .and_then(|track| track.toptags)
        .map(|toptags| toptags.tag.into_iter().map(|tag| tag.name).collect())
        .unwrap_or_default())
}

#[async_trait]
impl GenreSource for LastFmClient {
    fn name(&self) -> &str {
        "Last.fm"
    }

    async fn tags(&self, artist: &str, track: &str) -> Result<Vec<String>> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("method", "track.getInfo"),
                ("api_key", self.api_key.as_str()),
                ("artist", artist),
                ("track", track),
                ("format", "json"),
            ])
            .send()
            .await?;

        let payload: TrackInfoResponse = response.json().await?;
        tag_names(payload)
    }
}
