//! Relational storage for finished listening sessions.
//!
//! Uses SQLx with MySQL. Two tables are written:
//! - `playbacks`: one row per finished session
//! - `artists`: one row per artist name with the cumulative seconds played and
//!   the latest played-at timestamp
//!
//! The tables are created out-of-band (see [`schema::create_schema`] and the
//! `setup-db` command). Writes go through the [`PlaybackSink`] trait so the
//! commit path can be tested without a database.

pub mod schema;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

use crate::{
    config::DatabaseConfig,
    error::Result,
    types::{PlaybackRecord, UNKNOWN},
    utils::{self, GENRES_MAX_LEN},
};

pub use schema::create_schema;

/// Write side of the store, one call per row.
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    /// Appends one `playbacks` row.
    async fn insert_playback(&self, record: &PlaybackRecord) -> Result<()>;

    /// Adds `seconds_played` to the artist's total and moves `played_at`
    /// forward, inserting the artist if it is not known yet.
    async fn upsert_artist(
        &self,
        name: &str,
        seconds_played: u32,
        played_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Creates a lazily connecting pool. Connection problems surface on the first
/// query instead of at startup.
pub fn connect(config: &DatabaseConfig) -> MySqlPool {
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.name);

    MySqlPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy_with(options)
}

/// Value stored in `playbacks.genres`: the joined tags, or `"Unknown"` when
/// nothing survives the join.
pub fn genres_column(genres: &[String]) -> String {
    let joined = utils::join_genres(genres, GENRES_MAX_LEN);
    if joined.is_empty() {
        UNKNOWN.to_string()
    } else {
        joined
    }
}

pub struct MySqlSink {
    pool: MySqlPool,
}

impl MySqlSink {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlaybackSink for MySqlSink {
    async fn insert_playback(&self, record: &PlaybackRecord) -> Result<()> {
        let genres = genres_column(&record.genres);
        let release_date = record
            .release_date
            .as_deref()
            .and_then(utils::parse_release_date);

        sqlx::query(
            "INSERT INTO playbacks \
             (song, album, artist, genres, duration_ms, seconds_played, played_at, album_cover_url, \
              song_uri, track_popularity, playback_device, release_date, playlist_name) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.song)
        .bind(&record.album)
        .bind(&record.artist)
        .bind(genres)
        .bind(record.duration_ms)
        .bind(record.seconds_played)
        .bind(record.played_at.naive_utc())
        .bind(&record.album_cover_url)
        .bind(&record.song_uri)
        .bind(record.popularity)
        .bind(&record.playback_device)
        .bind(release_date)
        .bind(&record.playlist_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_artist(
        &self,
        name: &str,
        seconds_played: u32,
        played_at: DateTime<Utc>,
    ) -> Result<()> {
        let played_at = played_at.naive_utc();

        // seconds_played is at least 1, so an existing row always changes
        let updated = sqlx::query(
            "UPDATE artists \
             SET seconds_played = seconds_played + ?, played_at = GREATEST(played_at, ?) \
             WHERE artist_name = ?",
        )
        .bind(seconds_played)
        .bind(played_at)
        .bind(name)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query("INSERT INTO artists (artist_name, seconds_played, played_at) VALUES (?, ?, ?)")
                .bind(name)
                .bind(seconds_played)
                .bind(played_at)
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }
}
