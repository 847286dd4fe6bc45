use std::sync::Arc;

use tracing::{debug, info};

use crate::Error;
use crate::session::{TrackingSession, format_status_message, format_thousands};

/// Commands understood by the tracker. Prefix is always `!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCommand {
    Start,
    Stop,
    Status,
    /// Raw argument; parsed by the handler so bad input gets a usage reply.
    SetGoal(Option<String>),
}

/// Reply to send back to the channel the command came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub text: String,
    pub channel: String,
}

/// Splits a chat line into a tracker command, or `None` for anything else.
pub fn parse_command(message_text: &str) -> Option<TrackerCommand> {
    let trimmed = message_text.trim();
    let rest = trimmed.strip_prefix('!')?;

    let mut parts = rest.split_whitespace();
    let name = parts.next()?.to_ascii_lowercase();
    let arg = parts.next().map(str::to_string);

    match name.as_str() {
        "startms" => Some(TrackerCommand::Start),
        "stopms" => Some(TrackerCommand::Stop),
        "statusms" => Some(TrackerCommand::Status),
        "setgoal" => Some(TrackerCommand::SetGoal(arg)),
        _ => None,
    }
}

/// Human-readable text for a session rejection.
pub fn rejection_text(err: &Error) -> String {
    match err {
        Error::AlreadyRunning(channel) => format!("Bot is already running in <#{channel}>!"),
        Error::NotRunning => "Bot is not running!".to_string(),
        Error::InvalidGoal(value) => {
            format!("Invalid goal: {value}. The goal must be zero or greater.")
        }
        other => format!("Something went wrong: {other}"),
    }
}

/// Maps chat commands onto the tracking session.
pub struct CommandService {
    session: Arc<TrackingSession>,
}

impl CommandService {
    pub fn new(session: Arc<TrackingSession>) -> Self {
        debug!("Initializing CommandService");
        Self { session }
    }

    pub fn session(&self) -> &Arc<TrackingSession> {
        &self.session
    }

    /// Handles one chat line. Session rejections become reply text; only
    /// unexpected faults come back as `Err`.
    pub async fn handle_chat_line(
        &self,
        channel: &str,
        message_text: &str,
    ) -> Result<Option<CommandResponse>, Error> {
        let Some(cmd) = parse_command(message_text) else {
            return Ok(None);
        };
        debug!("Command {:?} from channel {}", cmd, channel);

        let outcome = match cmd {
            TrackerCommand::Start => self
                .session
                .start(channel.to_string())
                .await
                .map(|_| "Milestone tracking started.".to_string()),
            TrackerCommand::Stop => self
                .session
                .stop()
                .await
                .map(|_| "Milestone tracking stopped.".to_string()),
            TrackerCommand::Status => {
                let report = self.session.status().await;
                Ok(format_status_message(&report))
            }
            TrackerCommand::SetGoal(arg) => {
                let Some(value) = arg.as_deref().and_then(|a| a.replace(',', "").parse::<i64>().ok())
                else {
                    return Ok(Some(reply(channel, "Usage: !setgoal <number>".to_string())));
                };
                self.session
                    .set_goal(value)
                    .await
                    .map(|goal| format!("Milestone goal set to {}.", format_thousands(goal)))
            }
        };

        match outcome {
            Ok(text) => Ok(Some(reply(channel, text))),
            Err(e) if e.is_rejection() => {
                info!("Command rejected in channel {channel}: {e}");
                Ok(Some(reply(channel, rejection_text(&e))))
            }
            Err(e) => Err(e),
        }
    }
}

fn reply(channel: &str, text: String) -> CommandResponse {
    CommandResponse {
        text,
        channel: channel.to_string(),
    }
}
