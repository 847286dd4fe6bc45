pub mod command_service;

pub use command_service::{CommandResponse, CommandService, TrackerCommand, parse_command};
