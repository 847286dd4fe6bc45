// src/lib.rs

pub mod config;
pub mod http;
pub mod keepalive;
pub mod metrics;
pub mod platforms;
pub mod services;
pub mod session;
pub mod tasks;

pub use milestonebot_common::error::Error;
pub use http::{DefaultHttpClient, HttpClient};
pub use session::TrackingSession;
