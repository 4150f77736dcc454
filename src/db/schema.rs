use sqlx::mysql::MySqlPool;

use crate::{error::Result, success};

pub const CREATE_PLAYBACKS: &str = "\
CREATE TABLE IF NOT EXISTS playbacks (
    id INT AUTO_INCREMENT PRIMARY KEY,
    song VARCHAR(255) NOT NULL,
    album VARCHAR(255),
    artist VARCHAR(255) NOT NULL,
    genres VARCHAR(255),
    duration_ms INT NOT NULL,
    seconds_played INT NOT NULL,
    played_at DATETIME NOT NULL,
    album_cover_url VARCHAR(255),
    song_uri VARCHAR(255),
    track_popularity INT,
    playback_device VARCHAR(255),
    release_date DATE,
    playlist_name VARCHAR(255)
)";

pub const CREATE_ARTISTS: &str = "\
CREATE TABLE IF NOT EXISTS artists (
    id INT AUTO_INCREMENT PRIMARY KEY,
    artist_name VARCHAR(255) NOT NULL,
    seconds_played INT DEFAULT 0,
    played_at DATETIME NOT NULL,
    UNIQUE KEY uq_artist_name (artist_name)
)";

/// Creates both tables if they do not exist yet.
pub async fn create_schema(pool: &MySqlPool) -> Result<()> {
    sqlx::query(CREATE_PLAYBACKS).execute(pool).await?;
    success!("Table `playbacks` setup completed.");

    sqlx::query(CREATE_ARTISTS).execute(pool).await?;
    success!("Table `artists` setup completed.");

    Ok(())
}
