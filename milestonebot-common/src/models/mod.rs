// File: milestonebot-common/src/models/mod.rs
pub mod metrics;
pub mod session;

pub use metrics::{MetricsSnapshot, SnapshotSource};
pub use session::{OutputTarget, StatusReport};
