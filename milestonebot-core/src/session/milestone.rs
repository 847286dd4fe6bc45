use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::Error;

/// How far the goal jumps once visits reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MilestonePolicy {
    /// Add one of `choices`, picked at random.
    Fixed { choices: Vec<u64> },
    /// Add `percent`% of the current visits, rounded down.
    Percent { percent: u64 },
}

impl Default for MilestonePolicy {
    fn default() -> Self {
        MilestonePolicy::Fixed { choices: vec![100, 150] }
    }
}

impl MilestonePolicy {
    /// Always at least 1, so the next goal is strictly above `visits`.
    pub fn increment<R: Rng + ?Sized>(&self, visits: u64, rng: &mut R) -> u64 {
        let raw = match self {
            MilestonePolicy::Fixed { choices } => choices.choose(rng).copied().unwrap_or(1),
            MilestonePolicy::Percent { percent } => visits.saturating_mul(*percent) / 100,
        };
        raw.max(1)
    }

    pub fn next_goal<R: Rng + ?Sized>(&self, visits: u64, rng: &mut R) -> u64 {
        visits.saturating_add(self.increment(visits, rng))
    }
}

impl fmt::Display for MilestonePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MilestonePolicy::Fixed { choices } => {
                let list: Vec<String> = choices.iter().map(|c| c.to_string()).collect();
                write!(f, "fixed:{}", list.join(","))
            }
            MilestonePolicy::Percent { percent } => write!(f, "percent:{percent}"),
        }
    }
}

/// Parses `fixed:100,150` or `percent:5`.
impl FromStr for MilestonePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| Error::Config(format!("milestone policy '{s}' must look like 'fixed:100,150' or 'percent:5'")))?;

        match kind.trim().to_ascii_lowercase().as_str() {
            "fixed" => {
                let mut choices = Vec::new();
                for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let n: u64 = part
                        .parse()
                        .map_err(|e| Error::Config(format!("bad fixed increment '{part}': {e}")))?;
                    if n == 0 {
                        return Err(Error::Config("fixed increments must be greater than zero".into()));
                    }
                    choices.push(n);
                }
                if choices.is_empty() {
                    return Err(Error::Config("fixed policy needs at least one increment".into()));
                }
                Ok(MilestonePolicy::Fixed { choices })
            }
            "percent" => {
                let percent: u64 = value
                    .trim()
                    .parse()
                    .map_err(|e| Error::Config(format!("bad percent '{value}': {e}")))?;
                if percent == 0 {
                    return Err(Error::Config("percent must be greater than zero".into()));
                }
                Ok(MilestonePolicy::Percent { percent })
            }
            other => Err(Error::Config(format!("unknown milestone policy kind '{other}'"))),
        }
    }
}
