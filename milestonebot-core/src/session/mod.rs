// File: src/session/mod.rs

pub mod format;
pub mod milestone;
pub mod tracking;

pub use format::{format_status_message, format_thousands};
pub use milestone::MilestonePolicy;
pub use tracking::{SessionView, TrackingSession};
