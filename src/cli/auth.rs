use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::{
    config::Settings,
    error, info,
    management::TokenStore,
    server,
    spotify::Authenticator,
    success,
    types::AuthTokens,
    utils::SystemClock,
    warning,
};

/// How long `spotlog auth` waits for the browser round trip.
const AUTH_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs the browser-based authorization flow.
///
/// 1. Binds the authorization endpoints on `LOCAL_IP:SERVER_PORT`
/// 2. Opens the local start page, which links to Spotify's consent screen
/// 3. Waits until `/callback` has stored a new set of tokens
///
/// Binding failures and timeouts terminate the program.
pub async fn auth(settings: &Settings) {
    let store = TokenStore::new(settings.token_file.clone(), Arc::new(SystemClock));
    let auth = Arc::new(Authenticator::new(settings.spotify.clone(), store));
    let previous = auth.store().load().await.ok().flatten();

    let addr = settings.server_addr();
    let listener = match server::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => error!("Failed to bind authorization server on {}: {}", addr, e),
    };
    server::spawn_api_server(listener, Arc::clone(&auth));

    let url = settings.local_url();
    info!("Opening {} to authorize spotlog...", url);
    if webbrowser::open(&url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            url
        )
    }

    match wait_for_token(&auth, previous.as_ref()).await {
        Some(_) => success!(
            "Authentication successful! Tokens stored in {}",
            auth.store().path().display()
        ),
        None => error!("Authentication failed or timed out."),
    }
}

/// Polls the token file once per second until it holds tokens different from
/// `previous`, or the timeout expires.
async fn wait_for_token(auth: &Authenticator, previous: Option<&AuthTokens>) -> Option<AuthTokens> {
    let start = Instant::now();

    while start.elapsed() < AUTH_TIMEOUT {
        if let Ok(Some(tokens)) = auth.store().load().await {
            if previous != Some(&tokens) {
                return Some(tokens);
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}
