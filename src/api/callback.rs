use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query};

use crate::{spotify::Authenticator, success, warning};

pub const CALLBACK_SUCCESS: &str = "Authentication successful! Tokens have been saved.";
pub const CALLBACK_FAILURE: &str = "Error getting access token";

pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(auth): Extension<Arc<Authenticator>>,
) -> &'static str {
    let Some(code) = params.get("code") else {
        let reason = params.get("error").map(String::as_str).unwrap_or("missing code");
        warning!("Authorization callback without code: {}", reason);
        return CALLBACK_FAILURE;
    };

    match auth.exchange_code(code).await {
        Ok(_) => {
            success!("Authentication successful!");
            CALLBACK_SUCCESS
        }
        Err(e) => {
            warning!("Error getting token: {}", e);
            CALLBACK_FAILURE
        }
    }
}
