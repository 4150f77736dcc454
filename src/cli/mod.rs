//! # CLI Module
//!
//! Command implementations behind the `spotlog` binary.
//!
//! ## Commands
//!
//! - [`auth`] - Serves the authorization endpoints, opens the browser and
//!   waits until tokens have been stored
//! - [`track`] - Runs the authorization server and the once-per-second
//!   tracking loop until Ctrl-C
//! - [`setup_db`] - Creates the `playbacks` and `artists` tables
//!
//! ## Typical usage
//!
//! ```bash
//! spotlog setup-db     # once, against an empty database
//! spotlog auth         # once, or whenever the refresh token is revoked
//! spotlog track        # keep running
//! ```
//!
//! Every command receives already validated [`Settings`](crate::config::Settings).
//! Missing configuration never reaches this module; `main` treats it as fatal.

mod auth;
mod setup;
mod track;

pub use auth::auth;
pub use setup::setup_db;
pub use track::track;
