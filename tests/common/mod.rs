#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Mutex,
        atomic::{AtomicI64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use tokio::{net::TcpListener, sync::Semaphore};

use spotlog::{
    config::SpotifyConfig,
    db::PlaybackSink,
    error::{Error, Result},
    genres::GenreSource,
    spotify::PlaybackProvider,
    types::{PlaybackContext, PlaybackRecord, TrackIdentity, TrackSnapshot, UNKNOWN},
    utils::Clock,
};

/// Clock that only moves when told to.
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(millis).unwrap()
    }
}

pub fn snapshot(song: &str, artist: &str, is_playing: bool) -> TrackSnapshot {
    TrackSnapshot {
        song: song.to_string(),
        album: format!("{song} (Single)"),
        artists: artist.split(", ").map(str::to_string).collect(),
        duration_ms: 200_000,
        release_date: Some("2001-09-10".to_string()),
        played_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        is_playing,
        album_cover_url: Some("https://i.scdn.co/image/cover".to_string()),
        song_uri: format!("spotify:track:{}", song.to_lowercase()),
        popularity: 42,
        context: Some(PlaybackContext {
            kind: "album".to_string(),
            href: None,
        }),
        playlist_name: UNKNOWN.to_string(),
        rate_limited: false,
    }
}

pub fn playing(song: &str, artist: &str) -> TrackSnapshot {
    snapshot(song, artist, true)
}

pub fn paused(song: &str, artist: &str) -> TrackSnapshot {
    snapshot(song, artist, false)
}

/// One scripted answer of [`FakeProvider::current_track`].
#[derive(Debug, Clone)]
pub enum Step {
    Track(TrackSnapshot),
    Nothing,
    RateLimited,
    Fail,
}

/// Provider that replays a script and reports "nothing playing" afterwards.
pub struct FakeProvider {
    steps: Mutex<VecDeque<Step>>,
    device: String,
    delay: Duration,
    pub calls: AtomicUsize,
    pub device_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub known: Mutex<Vec<Option<TrackIdentity>>>,
}

impl FakeProvider {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            device: "Computer".to_string(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            device_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            known: Mutex::new(Vec::new()),
        }
    }

    /// Every call takes at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn device_calls(&self) -> usize {
        self.device_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaybackProvider for FakeProvider {
    async fn current_track(&self, known: Option<&TrackIdentity>) -> Result<Option<TrackSnapshot>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.known.lock().unwrap().push(known.cloned());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::Nothing);
        match step {
            Step::Track(snapshot) => Ok(Some(snapshot)),
            Step::Nothing => Ok(None),
            Step::RateLimited => Err(Error::RateLimited),
            Step::Fail => Err(Error::Transport("connection reset".to_string())),
        }
    }

    async fn playback_device(&self) -> String {
        self.device_calls.fetch_add(1, Ordering::SeqCst);
        self.device.clone()
    }
}

/// Sink that keeps everything in memory and can be told to fail.
#[derive(Default)]
pub struct RecordingSink {
    pub playbacks: Mutex<Vec<PlaybackRecord>>,
    pub artist_totals: Mutex<HashMap<String, (u32, DateTime<Utc>)>>,
    pub artist_calls: Mutex<Vec<String>>,
    failing_artist: Option<String>,
    fail_playbacks: bool,
    insert_delay: Duration,
}

impl RecordingSink {
    pub fn failing_artist(name: &str) -> Self {
        Self {
            failing_artist: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_playbacks() -> Self {
        Self {
            fail_playbacks: true,
            ..Self::default()
        }
    }

    pub fn with_insert_delay(delay: Duration) -> Self {
        Self {
            insert_delay: delay,
            ..Self::default()
        }
    }

    pub fn playbacks(&self) -> Vec<PlaybackRecord> {
        self.playbacks.lock().unwrap().clone()
    }

    pub fn artist_seconds(&self, name: &str) -> Option<u32> {
        self.artist_totals
            .lock()
            .unwrap()
            .get(name)
            .map(|(seconds, _)| *seconds)
    }
}

#[async_trait]
impl PlaybackSink for RecordingSink {
    async fn insert_playback(&self, record: &PlaybackRecord) -> Result<()> {
        if !self.insert_delay.is_zero() {
            tokio::time::sleep(self.insert_delay).await;
        }
        if self.fail_playbacks {
            return Err(Error::Transport("database unreachable".to_string()));
        }
        self.playbacks.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn upsert_artist(
        &self,
        name: &str,
        seconds_played: u32,
        played_at: DateTime<Utc>,
    ) -> Result<()> {
        self.artist_calls.lock().unwrap().push(name.to_string());
        if self.failing_artist.as_deref() == Some(name) {
            return Err(Error::Transport("deadlock found".to_string()));
        }

        let mut totals = self.artist_totals.lock().unwrap();
        let entry = totals.entry(name.to_string()).or_insert((0, played_at));
        entry.0 += seconds_played;
        entry.1 = entry.1.max(played_at);
        Ok(())
    }
}

/// Genre source with a fixed answer.
pub struct FixedGenres {
    name: &'static str,
    tags: Option<Vec<String>>,
    pub calls: AtomicUsize,
}

impl FixedGenres {
    pub fn tags(name: &'static str, tags: &[&str]) -> Self {
        Self {
            name,
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty(name: &'static str) -> Self {
        Self::tags(name, &[])
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            tags: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenreSource for FixedGenres {
    fn name(&self) -> &str {
        self.name
    }

    async fn tags(&self, _artist: &str, _track: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tags
            .clone()
            .ok_or_else(|| Error::Transport("timed out".to_string()))
    }
}

/// Genre source that holds every lookup until released.
pub struct GatedGenres {
    gate: Semaphore,
    tags: Vec<String>,
    pub finished: AtomicUsize,
}

impl GatedGenres {
    pub fn new(tags: &[&str]) -> Self {
        Self {
            gate: Semaphore::new(0),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            finished: AtomicUsize::new(0),
        }
    }

    pub fn release(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenreSource for GatedGenres {
    fn name(&self) -> &str {
        "Gated"
    }

    async fn tags(&self, _artist: &str, _track: &str) -> Result<Vec<String>> {
        let _permit = self.gate.acquire().await.unwrap();
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(self.tags.clone())
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn spotify_config(base_url: &str) -> SpotifyConfig {
    SpotifyConfig {
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        redirect_uri: "http://127.0.0.1:3616/callback".to_string(),
        api_url: format!("{base_url}/v1"),
        auth_url: format!("{base_url}/authorize"),
        token_url: format!("{base_url}/api/token"),
    }
}

/// Polls `condition` until it holds, yielding to other tasks in between.
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
