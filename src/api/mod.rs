//! # API Module
//!
//! HTTP endpoints of the local authorization server.
//!
//! ## Endpoints
//!
//! - [`index`] - `GET /` returns a link to the provider's authorization page
//! - [`callback`] - `GET /callback?code=` exchanges the authorization code for
//!   tokens and stores them
//! - [`health`] - `GET /health` returns status and version
//!
//! The router is served by [`crate::server`] on `LOCAL_IP:SERVER_PORT`, both
//! from `spotlog auth` and alongside the tick loop in `spotlog track`.

mod callback;
mod health;
mod index;

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

pub use callback::{CALLBACK_FAILURE, CALLBACK_SUCCESS, callback};
pub use health::health;
pub use index::index;

use crate::spotify::Authenticator;

pub fn router(auth: Arc<Authenticator>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/callback", get(callback))
        .route("/health", get(health))
        .layer(Extension(auth))
}
