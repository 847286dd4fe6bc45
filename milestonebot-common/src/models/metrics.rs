/// Where a snapshot's numbers came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// All upstream calls succeeded.
    Live,
    /// Synthesized after an upstream fault; visits are bounded below by
    /// the last known value.
    Fallback,
}

/// Result of one metrics fetch. Consumed immediately, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub active_players: u64,
    pub visits: u64,
    pub source: SnapshotSource,
}

impl MetricsSnapshot {
    pub fn live(active_players: u64, visits: u64) -> Self {
        Self { active_players, visits, source: SnapshotSource::Live }
    }

    pub fn fallback(active_players: u64, visits: u64) -> Self {
        Self { active_players, visits, source: SnapshotSource::Fallback }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == SnapshotSource::Fallback
    }
}
