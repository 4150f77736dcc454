use std::sync::Arc;

use crate::{
    config::Settings,
    db::{self, MySqlSink},
    error,
    genres::GenreResolver,
    info,
    management::TokenStore,
    server,
    spotify::{Authenticator, SpotifyClient},
    success,
    tracker::{
        Committer, SessionTracker,
        scheduler::{self, TICK_PERIOD},
    },
    utils::{Clock, SystemClock},
    warning,
};

/// Runs the tracker until Ctrl-C.
///
/// The authorization endpoints are served from the same process so that the
/// user can (re-)authorize while tracking. Queued commits are drained before
/// the command returns.
pub async fn track(settings: &Settings) {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = TokenStore::new(settings.token_file.clone(), Arc::clone(&clock));
    let auth = Arc::new(Authenticator::new(settings.spotify.clone(), store));

    let addr = settings.server_addr();
    let listener = match server::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => error!("Failed to bind authorization server on {}: {}", addr, e),
    };
    server::spawn_api_server(listener, Arc::clone(&auth));

    if !matches!(auth.store().load().await, Ok(Some(_))) {
        warning!(
            "No tokens found. Open {} in a browser to authorize spotlog.",
            settings.local_url()
        );
    }

    let provider = Arc::new(SpotifyClient::new(
        settings.spotify.api_url.clone(),
        auth,
        clock,
    ));
    let genres = Arc::new(GenreResolver::from_config(&settings.genres));
    let sink = Arc::new(MySqlSink::new(db::connect(&settings.database)));
    let tracker = SessionTracker::new(provider, genres, Committer::spawn(sink));

    info!(
        "Tracking playback every {}ms. Press Ctrl-C to stop.",
        TICK_PERIOD.as_millis()
    );
    scheduler::run(tracker, TICK_PERIOD, shutdown_signal()).await;
    success!("Tracker stopped.");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warning!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
