/// A chat channel receiving updates, as the decimal channel id string
/// the chat layer hands us.
pub type OutputTarget = String;

/// Numbers after one update step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub active_players: u64,
    /// The clamped, last-known visit count.
    pub visits: u64,
    pub milestone_goal: u64,
}
