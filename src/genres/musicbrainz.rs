//! MusicBrainz recording search.
//!
//! MusicBrainz requires a User-Agent header and rate limits anonymous clients
//! to one request per second. One search per new session stays well below.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::GenreSource;
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("spotlog/", env!("CARGO_PKG_VERSION"));

pub struct MusicBrainzClient {
    http: Client,
    base_url: String,
}

impl MusicBrainzClient {
    pub fn new(base_url: &str) -> Self {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecordingSearch {
    #[serde(default)]
    recordings: Vec<Recording>,
}

#[derive(Debug, Deserialize)]
struct Recording {
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

/// Lucene query matching both the artist credit and the recording title.
fn recording_query(artist: &str, track: &str) -> String {
    format!(
        "artist:\"{}\" AND recording:\"{}\"",
        escape(artist),
        escape(track)
    )
}

fn escape(term: &str) -> String {
    term.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Tags of the best (first) hit only.
fn first_recording_tags(search: RecordingSearch) -> Vec<String> {
    search
        .recordings
        .into_iter()
        .next()
        .map(|recording| recording.tags.into_iter().map(|tag| tag.name).collect())
        .unwrap_or_default()
}

#[async_trait]
impl GenreSource for MusicBrainzClient {
    fn name(&self) -> &str {
        "MusicBrainz"
    }

    async fn tags(&self, artist: &str, track: &str) -> Result<Vec<String>> {
        let url = format!("{}/recording/", self.base_url);
        let query = recording_query(artist, track);

        let response = self
            .http
            .get(&url)
            .query(&[("query", query.as_str()), ("fmt", "json")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http(status));
        }

        let search: RecordingSearch = response.json().await?;
        Ok(first_recording_tags(search))
    }
}
