mod common;

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tempfile::TempDir;

use common::*;
use spotlog::{
    error::Error,
    genres::GenreResolver,
    management::TokenStore,
    spotify::{Authenticator, PLAYLIST_LOOKUP_INTERVAL, SpotifyClient},
    tracker::{Committer, SessionTracker},
    types::TokenResponse,
    utils::Clock,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Player {
    Playing,
    /// Only the refreshed token is accepted.
    StaleRejected,
    Unauthorized,
    RateLimited,
    NoContent,
    EmptyBody,
}

struct FakeSpotify {
    base: Mutex<String>,
    player: Mutex<Player>,
    song: Mutex<String>,
    playlist_limited: AtomicBool,
    refresh_fails: AtomicBool,
    devices_fail: AtomicBool,
    player_calls: AtomicUsize,
    token_calls: AtomicUsize,
    playlist_calls: AtomicUsize,
    device_calls: AtomicUsize,
}

impl FakeSpotify {
    fn new(player: Player) -> Self {
        Self {
            base: Mutex::new(String::new()),
            player: Mutex::new(player),
            song: Mutex::new("Alison".to_string()),
            playlist_limited: AtomicBool::new(false),
            refresh_fails: AtomicBool::new(false),
            devices_fail: AtomicBool::new(false),
            player_calls: AtomicUsize::new(0),
            token_calls: AtomicUsize::new(0),
            playlist_calls: AtomicUsize::new(0),
            device_calls: AtomicUsize::new(0),
        }
    }

    fn playing_body(&self) -> Value {
        let base = self.base.lock().unwrap().clone();
        let song = self.song.lock().unwrap().clone();
        json!({
            "is_playing": true,
            "context": { "type": "playlist", "href": format!("{base}/v1/playlists/p1") },
            "item": {
                "name": song,
                "duration_ms": 230000,
                "uri": "spotify:track:alison",
                "popularity": 60,
                "artists": [{ "name": "Slowdive" }],
                "album": {
                    "name": "Souvlaki",
                    "release_date": "1993-05-17",
                    "images": [{ "url": "https://i.scdn.co/image/souvlaki" }]
                }
            }
        })
    }

    fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

async fn currently_playing(State(fake): State<Arc<FakeSpotify>>, headers: HeaderMap) -> Response {
    fake.player_calls.fetch_add(1, Ordering::SeqCst);
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let player = *fake.player.lock().unwrap();

    match player {
        Player::Playing => Json(fake.playing_body()).into_response(),
        Player::StaleRejected if bearer == "Bearer fresh-token" => {
            Json(fake.playing_body()).into_response()
        }
        Player::StaleRejected | Player::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        Player::RateLimited => StatusCode::TOO_MANY_REQUESTS.into_response(),
        Player::NoContent => StatusCode::NO_CONTENT.into_response(),
        Player::EmptyBody => (StatusCode::OK, "").into_response(),
    }
}

async fn token(
    State(fake): State<Arc<FakeSpotify>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    fake.token_calls.fetch_add(1, Ordering::SeqCst);
    if fake.refresh_fails.load(Ordering::SeqCst) {
        return (StatusCode::BAD_REQUEST, "invalid_grant").into_response();
    }
    if form.get("grant_type").map(String::as_str) != Some("refresh_token")
        || form.get("refresh_token").map(String::as_str) != Some("refresh-1")
    {
        return StatusCode::BAD_REQUEST.into_response();
    }
    Json(json!({ "access_token": "fresh-token", "expires_in": 3600 })).into_response()
}

async fn devices(State(fake): State<Arc<FakeSpotify>>) -> Response {
    fake.device_calls.fetch_add(1, Ordering::SeqCst);
    if fake.devices_fail.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(json!({
        "devices": [
            { "id": "1", "is_active": false, "type": "Smartphone" },
            { "id": "2", "is_active": true, "type": "Computer" }
        ]
    }))
    .into_response()
}

async fn playlist(State(fake): State<Arc<FakeSpotify>>) -> Response {
    fake.playlist_calls.fetch_add(1, Ordering::SeqCst);
    if fake.playlist_limited.load(Ordering::SeqCst) {
        return StatusCode::TOO_MANY_REQUESTS.into_response();
    }
    Json(json!({ "name": "Dream" })).into_response()
}

struct Harness {
    fake: Arc<FakeSpotify>,
    auth: Arc<Authenticator>,
    client: Arc<SpotifyClient>,
    clock: Arc<ManualClock>,
    _dir: TempDir,
}

async fn harness(player: Player, authenticated: bool) -> Harness {
    let fake = Arc::new(FakeSpotify::new(player));
    let router = Router::new()
        .route("/v1/me/player/currently-playing", get(currently_playing))
        .route("/v1/me/player/devices", get(devices))
        .route("/v1/playlists/p1", get(playlist))
        .route("/api/token", post(token))
        .with_state(Arc::clone(&fake));
    let base = serve(router).await;
    *fake.base.lock().unwrap() = base.clone();

    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::default());
    let store = TokenStore::new(dir.path().join("tokens.json"), Arc::clone(&clock) as _);
    if authenticated {
        store
            .save(&TokenResponse {
                access_token: "stale-token".to_string(),
                refresh_token: Some("refresh-1".to_string()),
                expires_in: 3600,
                scope: None,
            })
            .await
            .unwrap();
    }

    let config = spotify_config(&base);
    let auth = Arc::new(Authenticator::new(config.clone(), store));
    let client = Arc::new(SpotifyClient::new(
        config.api_url,
        Arc::clone(&auth),
        Arc::clone(&clock) as _,
    ));

    Harness {
        fake,
        auth,
        client,
        clock,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_current_track_snapshot() {
    let h = harness(Player::Playing, true).await;

    let snapshot = h.client.current_track(None).await.unwrap().unwrap();

    assert_eq!(snapshot.song, "Alison");
    assert_eq!(snapshot.album, "Souvlaki");
    assert_eq!(snapshot.artist(), "Slowdive");
    assert_eq!(snapshot.duration_ms, 230_000);
    assert_eq!(snapshot.release_date.as_deref(), Some("1993-05-17"));
    assert_eq!(
        snapshot.album_cover_url.as_deref(),
        Some("https://i.scdn.co/image/souvlaki")
    );
    assert_eq!(snapshot.popularity, 60);
    assert_eq!(snapshot.played_at, h.clock.now());
    assert_eq!(snapshot.playlist_name, "Dream");
    assert!(snapshot.is_playing);
}

#[tokio::test]
async fn test_nothing_playing() {
    let h = harness(Player::NoContent, true).await;
    assert_eq!(h.client.current_track(None).await.unwrap(), None);

    *h.fake.player.lock().unwrap() = Player::EmptyBody;
    assert_eq!(h.client.current_track(None).await.unwrap(), None);
}

#[tokio::test]
async fn test_rejected_token_is_refreshed_and_request_repeated() {
    let h = harness(Player::StaleRejected, true).await;

    let snapshot = h.client.current_track(None).await.unwrap();

    assert!(snapshot.is_some());
    assert_eq!(FakeSpotify::count(&h.fake.player_calls), 2);
    assert_eq!(FakeSpotify::count(&h.fake.token_calls), 1);

    let stored = h.auth.store().load().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "fresh-token");
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_persistent_unauthorized_is_retried_once() {
    let h = harness(Player::Unauthorized, true).await;

    let result = h.client.current_track(None).await;

    assert!(matches!(result, Err(Error::Http(status)) if status == StatusCode::UNAUTHORIZED));
    assert_eq!(FakeSpotify::count(&h.fake.player_calls), 2);
    assert_eq!(FakeSpotify::count(&h.fake.token_calls), 1);
}

#[tokio::test]
async fn test_failed_refresh_is_reported() {
    let h = harness(Player::StaleRejected, true).await;
    h.fake.refresh_fails.store(true, Ordering::SeqCst);

    let result = h.client.current_track(None).await;

    assert!(matches!(result, Err(Error::RefreshFailed(_))));
    assert_eq!(FakeSpotify::count(&h.fake.player_calls), 1);
}

#[tokio::test]
async fn test_rate_limit_is_not_retried() {
    let h = harness(Player::RateLimited, true).await;

    let result = h.client.current_track(None).await;

    assert!(matches!(result, Err(Error::RateLimited)));
    assert_eq!(FakeSpotify::count(&h.fake.player_calls), 1);
    assert_eq!(FakeSpotify::count(&h.fake.token_calls), 0);
}

#[tokio::test]
async fn test_expired_token_is_refreshed_before_request() {
    let h = harness(Player::StaleRejected, true).await;
    h.clock.advance(Duration::from_secs(3600));

    let snapshot = h.client.current_track(None).await.unwrap();

    assert!(snapshot.is_some());
    assert_eq!(FakeSpotify::count(&h.fake.token_calls), 1);
    assert_eq!(FakeSpotify::count(&h.fake.player_calls), 1);
}

#[tokio::test]
async fn test_without_tokens_nothing_is_requested() {
    let h = harness(Player::Playing, false).await;

    let result = h.client.current_track(None).await;

    assert!(matches!(result, Err(Error::Unauthenticated)));
    assert_eq!(FakeSpotify::count(&h.fake.player_calls), 0);
}

#[tokio::test]
async fn test_playlist_lookup_is_debounced() {
    let h = harness(Player::Playing, true).await;

    let first = h.client.current_track(None).await.unwrap().unwrap();
    assert_eq!(first.playlist_name, "Dream");
    assert_eq!(FakeSpotify::count(&h.fake.playlist_calls), 1);

    // within the interval: suppressed
    let second = h.client.current_track(None).await.unwrap().unwrap();
    assert_eq!(second.playlist_name, "Unknown");
    assert_eq!(FakeSpotify::count(&h.fake.playlist_calls), 1);

    h.clock.advance(PLAYLIST_LOOKUP_INTERVAL);

    // the same track as the one being tracked is never looked up
    let known = first.identity();
    let third = h.client.current_track(Some(&known)).await.unwrap().unwrap();
    assert_eq!(third.playlist_name, "Unknown");
    assert_eq!(FakeSpotify::count(&h.fake.playlist_calls), 1);

    let fourth = h.client.current_track(None).await.unwrap().unwrap();
    assert_eq!(fourth.playlist_name, "Dream");
    assert_eq!(FakeSpotify::count(&h.fake.playlist_calls), 2);
}

#[tokio::test]
async fn test_active_device_type() {
    let h = harness(Player::Playing, true).await;

    assert_eq!(h.client.playback_device().await, "Computer");
    assert_eq!(FakeSpotify::count(&h.fake.device_calls), 1);
}

#[tokio::test]
async fn test_device_failure_degrades_to_unknown() {
    let h = harness(Player::Playing, true).await;
    h.fake.devices_fail.store(true, Ordering::SeqCst);

    assert_eq!(h.client.playback_device().await, "Unknown");
}

#[tokio::test]
async fn test_rate_limited_playlist_lookup_suppresses_device_call() {
    let h = harness(Player::Playing, true).await;
    let sink = Arc::new(RecordingSink::default());
    let genres = GenreResolver::new(
        Arc::new(FixedGenres::empty("Last.fm")),
        Arc::new(FixedGenres::empty("MusicBrainz")),
    );
    let mut tracker = SessionTracker::new(
        Arc::clone(&h.client) as _,
        Arc::new(genres),
        Committer::spawn(Arc::clone(&sink) as _),
    );

    tracker.tick().await;
    assert_eq!(FakeSpotify::count(&h.fake.playlist_calls), 1);

    *h.fake.song.lock().unwrap() = "Souvlaki Space Station".to_string();
    h.fake.playlist_limited.store(true, Ordering::SeqCst);
    h.clock.advance(Duration::from_secs(6));

    tracker.tick().await;
    assert_eq!(FakeSpotify::count(&h.fake.playlist_calls), 2);
    assert_eq!(FakeSpotify::count(&h.fake.device_calls), 0);
    assert_eq!(
        tracker.session().unwrap().identity().song,
        "Souvlaki Space Station"
    );

    tracker.shutdown().await;
    let playbacks = sink.playbacks();
    assert_eq!(playbacks.len(), 1);
    assert_eq!(playbacks[0].song, "Alison");
    assert_eq!(playbacks[0].playback_device, "Unknown");
}

#[tokio::test]
async fn test_rate_limited_playlist_lookup_marks_snapshot() {
    let h = harness(Player::Playing, true).await;
    h.fake.playlist_limited.store(true, Ordering::SeqCst);

    let snapshot = h.client.current_track(None).await.unwrap().unwrap();

    assert!(snapshot.rate_limited);
    assert_eq!(snapshot.playlist_name, "Unknown");
    assert_eq!(FakeSpotify::count(&h.fake.playlist_calls), 1);
}

#[tokio::test]
async fn test_refreshed_token_survives_failed_write() {
    let h = harness(Player::StaleRejected, true).await;
    // the temp file cannot be created, so writing the token file fails
    std::fs::create_dir(h.auth.store().path().with_extension("json.tmp")).unwrap();

    let first = h.client.current_track(None).await.unwrap();
    assert!(first.is_some());
    assert_eq!(FakeSpotify::count(&h.fake.player_calls), 2);
    assert_eq!(FakeSpotify::count(&h.fake.token_calls), 1);

    // the file still holds the rejected token, the refreshed one is used anyway
    let stored = h.auth.store().load().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "stale-token");

    let second = h.client.current_track(None).await.unwrap();
    assert!(second.is_some());
    assert_eq!(FakeSpotify::count(&h.fake.player_calls), 3);
    assert_eq!(FakeSpotify::count(&h.fake.token_calls), 1);
}
