// File: src/platforms/mod.rs

use async_trait::async_trait;
use crate::Error;

pub use milestonebot_common::traits::platform_traits::ConnectionStatus;

#[async_trait]
pub trait PlatformIntegration {
    async fn connect(&mut self) -> Result<(), Error>;
    async fn disconnect(&mut self) -> Result<(), Error>;
    async fn send_message(&self, channel: &str, message: &str) -> Result<(), Error>;
    async fn get_connection_status(&self) -> Result<ConnectionStatus, Error>;
}

// Re-export submodules
pub mod discord;
