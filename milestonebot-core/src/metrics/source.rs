use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, warn};

use milestonebot_common::models::MetricsSnapshot;
use milestonebot_common::traits::MetricsSource;

use crate::config::FallbackConfig;
use crate::metrics::upstream::UpstreamClient;

/// Builds the snapshot reported when the upstream is unreachable.
///
/// Visits are `max(last_known_visits, visits_floor)`, so a fallback can never
/// report fewer visits than were already seen. The player count is a small
/// random placeholder from the configured range.
pub fn fallback_snapshot<R: Rng + ?Sized>(
    config: &FallbackConfig,
    last_known_visits: u64,
    rng: &mut R,
) -> MetricsSnapshot {
    let lo = config.players_min.min(config.players_max);
    let hi = config.players_min.max(config.players_max);
    let players = rng.random_range(lo..=hi);
    MetricsSnapshot::fallback(players, last_known_visits.max(config.visits_floor))
}

/// `MetricsSource` backed by the upstream HTTP API.
///
/// This is the recoverable fault boundary: anything the upstream client
/// returns as `Err` becomes a fallback snapshot here.
pub struct HttpMetricsSource {
    upstream: UpstreamClient,
    fallback: FallbackConfig,
}

impl HttpMetricsSource {
    pub fn new(upstream: UpstreamClient, fallback: FallbackConfig) -> Self {
        Self { upstream, fallback }
    }
}

#[async_trait]
impl MetricsSource for HttpMetricsSource {
    async fn fetch(&self, target_id: u64, last_known_visits: u64) -> MetricsSnapshot {
        match self.upstream.fetch_snapshot(target_id).await {
            Ok(snap) => {
                debug!(
                    "place {target_id}: {} players, {} visits",
                    snap.active_players, snap.visits
                );
                snap
            }
            Err(e) => {
                let snap = fallback_snapshot(&self.fallback, last_known_visits, &mut rand::rng());
                warn!(
                    "Metrics fetch for place {target_id} failed => {e}. Falling back to {} players, {} visits",
                    snap.active_players, snap.visits
                );
                snap
            }
        }
    }
}
