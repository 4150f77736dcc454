//! # Session Tracking
//!
//! Turns the once-per-second stream of "currently playing" snapshots into
//! finished listening sessions.
//!
//! ## States
//!
//! ```text
//!            playing A                      not playing / no data
//!   Idle ──────────────▶ Playing(A) ─────────────────────────────▶ Paused(A)
//!                         │   ▲  ▲                                    │
//!               playing B │   │  └────────── playing A (resumed) ─────┘
//!       (commit A, open B)│   │
//!                         └───┘
//! ```
//!
//! - Every playing tick on the open session adds one second. A tick is one
//!   second by definition; wall-clock drift is not corrected.
//! - Pausing never finalizes a session. A missing snapshot (nothing loaded,
//!   rate limited, transport error) is treated exactly like a paused one and
//!   the last identity stays the comparison baseline.
//! - A playing snapshot with a different identity finalizes the open session:
//!   the device is resolved once, the record is queued on the [`Committer`]
//!   and a new session starts at one second. If the snapshot was already rate
//!   limited the device is recorded as `"Unknown"` without another request.
//! - Genres for a new session are resolved in a spawned task that may only
//!   touch the session's [`GenreSlot`]. If the session is finished first the
//!   late result is discarded.
//!
//! The tracker is driven by exactly one caller at a time (see [`scheduler`]).

pub mod committer;
pub mod scheduler;
pub mod session;

use std::sync::Arc;

pub use committer::Committer;
pub use session::{GenreSlot, Session};

use crate::{
    error::Error,
    genres::GenreResolver,
    info,
    spotify::PlaybackProvider,
    types::{TrackSnapshot, UNKNOWN},
    utils, warning,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// What a single observation did to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing playing and nothing was playing before.
    Idle,
    /// A new session was opened (after finalizing the previous one, if any).
    Started,
    /// Same track still playing, one more second counted.
    Continued,
    /// Same track playing again after a pause, one more second counted.
    Resumed,
    /// Playback stopped on this tick.
    Paused,
    /// Playback is still stopped.
    StillPaused,
}

pub struct SessionTracker {
    provider: Arc<dyn PlaybackProvider>,
    genres: Arc<GenreResolver>,
    committer: Committer,
    state: PlaybackState,
    session: Option<Session>,
}

impl SessionTracker {
    pub fn new(
        provider: Arc<dyn PlaybackProvider>,
        genres: Arc<GenreResolver>,
        committer: Committer,
    ) -> Self {
        Self {
            provider,
            genres,
            committer,
            state: PlaybackState::Idle,
            session: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Fetches one snapshot and feeds it to [`observe`](Self::observe).
    ///
    /// Never fails: every provider error is logged and the tick continues as
    /// "no data".
    pub async fn tick(&mut self) -> Transition {
        let known = self.session.as_ref().map(|session| session.identity().clone());

        let snapshot = match self.provider.current_track(known.as_ref()).await {
            Ok(snapshot) => snapshot,
            Err(Error::RateLimited) => {
                info!("Rate limit reached. Will retry on next song.");
                None
            }
            Err(e) => {
                warning!("Error fetching currently playing track: {}", e);
                None
            }
        };

        self.observe(snapshot).await
    }

    /// Applies one snapshot (or the absence of one) to the state machine.
    pub async fn observe(&mut self, snapshot: Option<TrackSnapshot>) -> Transition {
        match snapshot {
            Some(snapshot) if snapshot.is_playing => self.on_playing(snapshot).await,
            _ => self.on_stopped(),
        }
    }

    /// Stops the tracker and waits for queued commits. The open session, if
    /// any, is not saved.
    pub async fn shutdown(self) {
        if let Some(session) = &self.session {
            info!(
                "Stopping with {} open for {}s, it will not be saved.",
                session.identity(),
                session.seconds_played()
            );
        }
        self.committer.close().await;
    }

    async fn on_playing(&mut self, snapshot: TrackSnapshot) -> Transition {
        let was_paused = self.state == PlaybackState::Paused;
        self.state = PlaybackState::Playing;

        if let Some(session) = self.session.as_mut() {
            if session.identity() == &snapshot.identity() {
                session.tick();
                if was_paused {
                    info!("Playback resumed.");
                    return Transition::Resumed;
                }
                return Transition::Continued;
            }
        }

        if let Some(previous) = self.session.take() {
            self.finalize(previous, snapshot.rate_limited).await;
        }
        self.open(snapshot);
        Transition::Started
    }

    fn on_stopped(&mut self) -> Transition {
        match self.state {
            PlaybackState::Playing => {
                info!("Playback paused.");
                self.state = PlaybackState::Paused;
                Transition::Paused
            }
            PlaybackState::Paused => Transition::StillPaused,
            PlaybackState::Idle => Transition::Idle,
        }
    }

    async fn finalize(&mut self, session: Session, rate_limited: bool) {
        let device = if rate_limited {
            info!("Rate limit reached. Skipping playback device lookup.");
            UNKNOWN.to_string()
        } else {
            self.provider.playback_device().await
        };
        let record = session.finish(device);
        self.committer.submit(record);
    }

    fn open(&mut self, snapshot: TrackSnapshot) {
        info!(
            "Now playing: {} by {} | {} | popularity {}",
            snapshot.song,
            snapshot.artist(),
            utils::format_duration(snapshot.duration_ms),
            snapshot.popularity
        );

        let session = Session::open(snapshot);
        let slot = session.genre_slot();
        let identity = session.identity().clone();
        let resolver = Arc::clone(&self.genres);

        tokio::spawn(async move {
            let genres = resolver.resolve(&identity.artist, &identity.song).await;
            let listed = genres.join(utils::GENRE_DELIMITER);
            if slot.attach(genres) {
                info!("Genres for {}: {}", identity.song, listed);
            } else {
                info!(
                    "Genres for {} arrived after it was saved, discarding.",
                    identity
                );
            }
        });

        self.session = Some(session);
    }
}
