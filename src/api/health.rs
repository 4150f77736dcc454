use std::sync::Arc;

use axum::{Extension, response::Json};
use serde_json::{Value, json};

use crate::spotify::Authenticator;

/// Liveness plus whether a token file is present.
pub async fn health(Extension(auth): Extension<Arc<Authenticator>>) -> Json<Value> {
    let authenticated = matches!(auth.store().load().await, Ok(Some(_)));

    Json(json!({
        "status": "ok",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "authenticated": authenticated,
    }))
}
