use async_trait::async_trait;

use crate::models::MetricsSnapshot;

/// Produces a best-effort snapshot for one tracked target.
///
/// Implementations never fail: upstream faults are turned into a fallback
/// snapshot whose visits are at least `last_known_visits`.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn fetch(&self, target_id: u64, last_known_visits: u64) -> MetricsSnapshot;
}
