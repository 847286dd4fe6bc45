// File: milestonebot-common/src/traits/mod.rs
pub mod metrics_traits;
pub mod platform_traits;

pub use metrics_traits::MetricsSource;
pub use platform_traits::{ConnectionStatus, Publisher};
