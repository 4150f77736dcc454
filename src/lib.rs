//! Spotify Listening Logger Library
//!
//! Polls Spotify's "currently playing" endpoint once per second, turns the
//! snapshots into listening sessions, enriches each session with genre tags and
//! writes finished sessions plus per-artist listening time to MySQL.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints of the local authorization server
//! - `cli` - Command implementations behind the binary's subcommands
//! - `config` - Configuration from environment variables and `.env` files
//! - `db` - MySQL persistence of sessions and artist aggregates
//! - `error` - Error taxonomy shared by all components
//! - `genres` - Genre tag lookup (Last.fm, falling back to MusicBrainz)
//! - `management` - Local token file storage
//! - `server` - Local HTTP server for the OAuth authorization flow
//! - `spotify` - Spotify Web API client and token refresh
//! - `tracker` - Session state machine, commit queue and tick scheduler
//! - `types` - Wire formats and domain types
//! - `utils` - Small helpers and the injectable clock
//!
//! # Example
//!
//! ```
//! use spotlog::{config, cli};
//!
//! #[tokio::main]
//! async fn main() -> spotlog::error::Result<()> {
//!     config::load_env().await?;
//!     let settings = config::Settings::from_env()?;
//!     cli::track(&settings).await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod genres;
pub mod management;
pub mod server;
pub mod spotify;
pub mod tracker;
pub mod types;
pub mod utils;

/// Prints an informational message with a blue bullet point.
///
/// Used to narrate what the tracker is doing: state transitions, token
/// refreshes, skipped lookups.
///
/// # Example
///
/// ```
/// info!("Playback paused.");
/// info!("Now playing: {} by {}", song, artist);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Track saved to database: {}", song);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only for startup-fatal conditions: missing configuration or a listener
/// that cannot be bound. Nothing inside the tick loop may call this.
///
/// # Example
///
/// ```
/// error!("Cannot load configuration: {}", e);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for every degraded call: transport errors, refresh failures, rows that
/// could not be written. The program keeps running.
///
/// # Example
///
/// ```
/// warning!("Error fetching playback device: {}", e);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
