//! Genre tag lookup for a played track.
//!
//! Two independent read-only sources are consulted in order: Last.fm's
//! `track.getInfo` top tags first, MusicBrainz recording tags as the fallback.
//! Both are fail-soft. A transport or parse error is logged and treated as
//! "no tags", so [`GenreResolver::resolve`] always returns something.
//!
//! The sources sit behind the [`GenreSource`] trait so the resolver (and the
//! session tracker that spawns it) can be exercised without network access.

mod lastfm;
mod musicbrainz;

use std::sync::Arc;

use async_trait::async_trait;

pub use lastfm::LastFmClient;
pub use musicbrainz::MusicBrainzClient;

use crate::{config::GenreConfig, error::Result, info, types::UNKNOWN, warning};

#[async_trait]
pub trait GenreSource: Send + Sync {
    /// Human readable name used in log lines.
    fn name(&self) -> &str;

    /// Tag names for the track. An empty list means the source knows nothing.
    async fn tags(&self, artist: &str, track: &str) -> Result<Vec<String>>;
}

pub struct GenreResolver {
    primary: Arc<dyn GenreSource>,
    secondary: Arc<dyn GenreSource>,
}

impl GenreResolver {
    pub fn new(primary: Arc<dyn GenreSource>, secondary: Arc<dyn GenreSource>) -> Self {
        Self { primary, secondary }
    }

    /// Last.fm as primary, MusicBrainz as secondary.
    pub fn from_config(config: &GenreConfig) -> Self {
        Self::new(
            Arc::new(LastFmClient::new(&config.lastfm_url, &config.lastfm_api_key)),
            Arc::new(MusicBrainzClient::new(&config.musicbrainz_url)),
        )
    }

    /// Returns the primary source's tags if there are any, else the secondary
    /// source's, else `["Unknown"]`.
    pub async fn resolve(&self, artist: &str, track: &str) -> Vec<String> {
        if let Some(tags) = lookup(self.primary.as_ref(), artist, track).await {
            return tags;
        }

        info!("Falling back to {}...", self.secondary.name());
        if let Some(tags) = lookup(self.secondary.as_ref(), artist, track).await {
            return tags;
        }

        vec![UNKNOWN.to_string()]
    }
}

async fn lookup(source: &dyn GenreSource, artist: &str, track: &str) -> Option<Vec<String>> {
    match source.tags(artist, track).await {
        Ok(tags) if !tags.is_empty() => Some(tags),
        Ok(_) => None,
        Err(e) => {
            warning!("Error fetching genre from {}: {}", source.name(), e);
            None
        }
    }
}
