use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::{PlaybackRecord, TrackIdentity, TrackSnapshot, UNKNOWN};

#[derive(Debug, Default)]
enum SlotState {
    #[default]
    Pending,
    Resolved(Vec<String>),
    Sealed,
}

/// Hand-off point between a session and its background genre lookup.
///
/// The lookup task only ever holds this slot, never the session. Once the
/// session is finished the slot is sealed and a late result is refused.
#[derive(Debug, Default)]
pub struct GenreSlot {
    state: Mutex<SlotState>,
}

impl GenreSlot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores resolved genres. Returns `false` if the session was already
    /// finished, in which case the genres are dropped.
    pub fn attach(&self, genres: Vec<String>) -> bool {
        let mut state = self.lock();
        if matches!(*state, SlotState::Sealed) {
            return false;
        }
        *state = SlotState::Resolved(genres);
        true
    }

    /// Closes the slot and hands out whatever was resolved so far.
    pub fn seal(&self) -> Option<Vec<String>> {
        match std::mem::replace(&mut *self.lock(), SlotState::Sealed) {
            SlotState::Resolved(genres) => Some(genres),
            _ => None,
        }
    }

    pub fn genres(&self) -> Option<Vec<String>> {
        match &*self.lock() {
            SlotState::Resolved(genres) => Some(genres.clone()),
            _ => None,
        }
    }

    pub fn is_sealed(&self) -> bool {
        matches!(*self.lock(), SlotState::Sealed)
    }
}

/// One contiguous run of ticks on the same track.
#[derive(Debug)]
pub struct Session {
    snapshot: TrackSnapshot,
    identity: TrackIdentity,
    seconds_played: u32,
    genres: Arc<GenreSlot>,
}

impl Session {
    /// Starts a session from its first observation, which counts as one second.
    pub fn open(snapshot: TrackSnapshot) -> Self {
        let identity = snapshot.identity();
        Self {
            snapshot,
            identity,
            seconds_played: 1,
            genres: Arc::new(GenreSlot::default()),
        }
    }

    pub fn identity(&self) -> &TrackIdentity {
        &self.identity
    }

    pub fn snapshot(&self) -> &TrackSnapshot {
        &self.snapshot
    }

    pub fn seconds_played(&self) -> u32 {
        self.seconds_played
    }

    /// One more second of listening.
    pub fn tick(&mut self) {
        self.seconds_played = self.seconds_played.saturating_add(1);
    }

    pub fn genre_slot(&self) -> Arc<GenreSlot> {
        Arc::clone(&self.genres)
    }

    pub fn genres(&self) -> Option<Vec<String>> {
        self.genres.genres()
    }

    /// Finalizes the session into the row that gets persisted. Genres that
    /// have not arrived yet are recorded as `["Unknown"]`.
    pub fn finish(self, playback_device: String) -> PlaybackRecord {
        let genres = self
            .genres
            .seal()
            .unwrap_or_else(|| vec![UNKNOWN.to_string()]);
        let artist = self.identity.artist;
        let snapshot = self.snapshot;

        PlaybackRecord {
            song: snapshot.song,
            album: snapshot.album,
            artist,
            genres,
            duration_ms: snapshot.duration_ms,
            seconds_played: self.seconds_played,
            played_at: snapshot.played_at,
            album_cover_url: snapshot.album_cover_url,
            song_uri: snapshot.song_uri,
            popularity: snapshot.popularity,
            playback_device,
            release_date: snapshot.release_date,
            playlist_name: snapshot.playlist_name,
        }
    }
}
