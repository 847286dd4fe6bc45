pub mod runtime;

pub use runtime::{DiscordMessageEvent, DiscordPlatform};
