use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};

use crate::{db::PlaybackSink, success, types::PlaybackRecord, utils, warning};

/// Single writer for finished sessions.
///
/// Records are queued from the tick path without waiting and written by one
/// background task in submission order, so two sessions can never land in the
/// store out of order.
pub struct Committer {
    tx: mpsc::UnboundedSender<PlaybackRecord>,
    worker: JoinHandle<()>,
}

impl Committer {
    pub fn spawn(sink: Arc<dyn PlaybackSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<PlaybackRecord>();

        let worker = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                commit(sink.as_ref(), &record).await;
                commit_artists(sink.as_ref(), &record).await;
            }
        });

        Self { tx, worker }
    }

    pub fn submit(&self, record: PlaybackRecord) {
        if let Err(e) = self.tx.send(record) {
            warning!("Commit queue closed, dropping {}", e.0.song);
        }
    }

    /// Stops accepting records and waits until every queued one is written.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            warning!("Commit worker stopped unexpectedly: {}", e);
        }
    }
}

/// Writes the `playbacks` row. A failure is logged and the row is dropped.
pub async fn commit(sink: &dyn PlaybackSink, record: &PlaybackRecord) -> bool {
    match sink.insert_playback(record).await {
        Ok(()) => {
            success!(
                "Track saved to database: {} by {} | {}s played | genres: {} | device: {} | release date: {} | playlist: {}",
                record.song,
                record.artist,
                record.seconds_played,
                record.genres.join(utils::GENRE_DELIMITER),
                record.playback_device,
                record.release_date.as_deref().unwrap_or("Unknown"),
                record.playlist_name
            );
            true
        }
        Err(e) => {
            warning!("Error saving {} to database: {}", record.song, e);
            false
        }
    }
}

/// Adds the session's seconds to every credited artist. Each artist is
/// upserted on its own; one failure does not stop the rest. Returns how many
/// artists were saved.
pub async fn commit_artists(sink: &dyn PlaybackSink, record: &PlaybackRecord) -> usize {
    let mut saved = 0;
    for artist in record.artist_names() {
        match sink
            .upsert_artist(&artist, record.seconds_played, record.played_at)
            .await
        {
            Ok(()) => {
                saved += 1;
                success!(
                    "Artist saved to database: {} (+{}s)",
                    artist,
                    record.seconds_played
                );
            }
            Err(e) => warning!("Error saving artist ({}) to database: {}", artist, e),
        }
    }
    saved
}
