//! Configuration management for spotlog.
//!
//! Configuration comes from environment variables, optionally seeded from a
//! `.env` file. Lookup order:
//! 1. Environment variables (highest priority, `dotenv` never overrides them)
//! 2. `.env` in the local data directory (`<data_local_dir>/spotlog/.env`)
//! 3. `.env` in the current working directory
//! 4. Application defaults for the optional values
//!
//! Every value is read once at startup into [`Settings`]. A missing required
//! variable is reported as [`Error::Config`] and the binary treats it as fatal.

use std::{
    env,
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use crate::error::{Error, Result};

pub const DEFAULT_SERVER_PORT: u16 = 3616;
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_LASTFM_URL: &str = "http://ws.audioscrobbler.com/2.0/";
pub const DEFAULT_MUSICBRAINZ_URL: &str = "https://musicbrainz.org/ws/2";

/// Scopes requested during authorization.
pub const SPOTIFY_SCOPE: &str =
    "user-library-read user-read-playback-state user-read-currently-playing";

/// Loads `.env` files from the local data directory and the working directory.
///
/// Missing files are not an error; the required values may just as well come
/// from the real environment. The data directory is created so the build
/// script's `.env.example` has a place to land.
pub async fn load_env() -> Result<()> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| Error::Config(e.to_string()))?;
    }
    // a local .env is optional, ignore its absence
    let _ = dotenv::dotenv();
    Ok(())
}

/// `<data_local_dir>/spotlog`, falling back to the working directory.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("spotlog");
    path
}

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub api_url: String,
    pub auth_url: String,
    pub token_url: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct GenreConfig {
    pub lastfm_api_key: String,
    pub lastfm_url: String,
    pub musicbrainz_url: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub spotify: SpotifyConfig,
    pub database: DatabaseConfig,
    pub genres: GenreConfig,
    pub local_ip: IpAddr,
    pub server_port: u16,
    pub token_file: PathBuf,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as
    /// missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required =
            |key: &str| get(key).ok_or_else(|| Error::Config(format!("{key} must be set")));
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let spotify = SpotifyConfig {
            client_id: required("SPOTIFY_CLIENT_ID")?,
            client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            redirect_uri: required("SPOTIFY_REDIRECT_URI")?,
            api_url: or_default("SPOTIFY_API_URL", DEFAULT_API_URL),
            auth_url: or_default("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL),
            token_url: or_default("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL),
        };

        let database = DatabaseConfig {
            host: required("DB_HOST")?,
            port: parse_port("DB_PORT", &required("DB_PORT")?)?,
            user: required("DB_USER")?,
            password: required("DB_PASS")?,
            name: required("DB_NAME")?,
        };

        let genres = GenreConfig {
            lastfm_api_key: required("LASTFM_API_KEY")?,
            lastfm_url: or_default("LASTFM_API_URL", DEFAULT_LASTFM_URL),
            musicbrainz_url: or_default("MUSICBRAINZ_API_URL", DEFAULT_MUSICBRAINZ_URL),
        };

        let local_ip_raw = required("LOCAL_IP")?;
        let local_ip = local_ip_raw
            .trim()
            .parse::<IpAddr>()
            .map_err(|e| Error::Config(format!("LOCAL_IP '{local_ip_raw}' is invalid: {e}")))?;

        let server_port = match get("SERVER_PORT") {
            Some(port) => parse_port("SERVER_PORT", &port)?,
            None => DEFAULT_SERVER_PORT,
        };

        let token_file = get("TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir().join("tokens.json"));

        Ok(Self {
            spotify,
            database,
            genres,
            local_ip,
            server_port,
            token_file,
        })
    }

    /// Address the authorization endpoints bind to.
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.local_ip, self.server_port)
    }

    /// Page the user opens to start the authorization flow.
    pub fn local_url(&self) -> String {
        format!("http://{}/", self.server_addr())
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|e| Error::Config(format!("{key} '{value}' is not a valid port: {e}")))
}
