use std::{future::Future, time::Duration};

use tokio::time::{self, MissedTickBehavior};

use super::SessionTracker;

/// Cadence of the tick loop. Each tick counts as one second of listening.
pub const TICK_PERIOD: Duration = Duration::from_millis(1000);

/// Drives `tracker` once per `period` until `shutdown` resolves.
///
/// Ticks are awaited inline, so two ticks never overlap. If a tick takes
/// longer than the period the missed ticks are skipped rather than bunched
/// up. On shutdown the tracker drains its commit queue before returning.
pub async fn run<F>(mut tracker: SessionTracker, period: Duration, shutdown: F)
where
    F: Future<Output = ()>,
{
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {
                tracker.tick().await;
            }
        }
    }

    tracker.shutdown().await;
}
