//! Runtime configuration for the tracker.
//!
//! Every struct here has a `Default` carrying the production values, so the
//! server binary only overrides what the user actually set.

use std::time::Duration;

use crate::session::milestone::MilestonePolicy;

/// Default place id tracked when none is configured.
pub const DEFAULT_PLACE_ID: u64 = 0;
pub const DEFAULT_MILESTONE_GOAL: u64 = 3358;
pub const DEFAULT_VISITS_FLOOR: u64 = 3258;
pub const DEFAULT_TICK_SECS: u64 = 65;
pub const DEFAULT_TICK_JITTER_SECS: u64 = 5;

/// Base URLs and paging limits for the upstream game API.
#[derive(Debug, Clone)]
pub struct UpstreamEndpoints {
    /// Host serving `/universes/v1/places/{placeId}/universe`.
    pub apis_base: String,
    /// Host serving `/v1/games` and the public server listing.
    pub games_base: String,
    pub page_limit: u32,
    /// Listing pages beyond this count are treated as a runaway cursor.
    pub max_pages: usize,
    pub request_timeout: Duration,
}

impl Default for UpstreamEndpoints {
    fn default() -> Self {
        Self {
            apis_base: "https://apis.roblox.com".to_string(),
            games_base: "https://games.roblox.com".to_string(),
            page_limit: 100,
            max_pages: 50,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// What the metrics source reports when the upstream cannot be reached.
#[derive(Debug, Clone)]
pub struct FallbackConfig {
    /// Fallback visits never drop below this baseline.
    pub visits_floor: u64,
    pub players_min: u64,
    pub players_max: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            visits_floor: DEFAULT_VISITS_FLOOR,
            players_min: 5,
            players_max: 25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub target_id: u64,
    pub initial_goal: u64,
    pub policy: MilestonePolicy,
    pub tick_period: Duration,
    /// Upper bound of the random delay before each tick's fetch.
    pub tick_jitter: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_id: DEFAULT_PLACE_ID,
            initial_goal: DEFAULT_MILESTONE_GOAL,
            policy: MilestonePolicy::default(),
            tick_period: Duration::from_secs(DEFAULT_TICK_SECS),
            tick_jitter: Duration::from_secs(DEFAULT_TICK_JITTER_SECS),
        }
    }
}
