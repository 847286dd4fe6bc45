// File: src/metrics/mod.rs

pub mod source;
pub mod upstream;

pub use source::{HttpMetricsSource, fallback_snapshot};
pub use upstream::UpstreamClient;
