// src/tasks/milestone_loop.rs

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::session::TrackingSession;

/// Spawns the periodic publish loop for one `start` of `session`.
///
/// The first tick fires one full period after arming. Each tick waits a
/// random jitter of up to `tick_jitter` before fetching. The loop ends once
/// `token` is cancelled; a publish already past its fetch finishes but
/// delivers nothing.
pub fn spawn_milestone_loop(
    session: Arc<TrackingSession>,
    token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let period = session.config().tick_period;
    let max_jitter = session.config().tick_jitter;

    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }

            let delay = jitter_delay(max_jitter);
            if !delay.is_zero() {
                debug!("Tick jitter {:?}", delay);
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = sleep(delay) => {}
                }
            }

            session.publish_update(&token).await;
        }

        info!("Milestone loop stopped.");
    })
}

/// Uniform delay in `[0, max]`, millisecond resolution.
pub fn jitter_delay(max: Duration) -> Duration {
    let max_ms = max.as_millis().min(u128::from(u64::MAX)) as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}
