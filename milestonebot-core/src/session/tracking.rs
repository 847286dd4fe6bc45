use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use milestonebot_common::models::{MetricsSnapshot, OutputTarget, StatusReport};
use milestonebot_common::traits::{MetricsSource, Publisher};

use crate::Error;
use crate::config::SessionConfig;
use crate::session::format::format_status_message;
use crate::tasks::milestone_loop::spawn_milestone_loop;

/// Everything guarded by the session lock.
#[derive(Debug)]
struct SessionState {
    running: bool,
    bound_output: Option<OutputTarget>,
    last_known_visits: u64,
    milestone_goal: u64,
    /// Cancels the ticker armed by the current `start`.
    ticker: Option<CancellationToken>,
}

/// Point-in-time copy of the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub running: bool,
    pub bound_output: Option<OutputTarget>,
    pub last_known_visits: u64,
    pub milestone_goal: u64,
}

/// Tracks one target and publishes its numbers to one chat channel.
///
/// All state sits behind a single async mutex. The lock is never held while
/// talking to the upstream API or to the chat platform, so a slow fetch
/// cannot stall `start`/`stop` handling.
pub struct TrackingSession {
    config: SessionConfig,
    source: Arc<dyn MetricsSource>,
    publisher: Arc<dyn Publisher>,
    state: Mutex<SessionState>,
}

impl TrackingSession {
    pub fn new(
        config: SessionConfig,
        source: Arc<dyn MetricsSource>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        debug!("Initializing TrackingSession for place {}", config.target_id);
        let state = SessionState {
            running: false,
            bound_output: None,
            last_known_visits: 0,
            milestone_goal: config.initial_goal,
            ticker: None,
        };
        Self {
            config,
            source,
            publisher,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub async fn view(&self) -> SessionView {
        let st = self.state.lock().await;
        SessionView {
            running: st.running,
            bound_output: st.bound_output.clone(),
            last_known_visits: st.last_known_visits,
            milestone_goal: st.milestone_goal,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.running
    }

    /// Binds `output`, posts one update right away, then arms the ticker.
    ///
    /// Fails with `AlreadyRunning` (naming the bound channel) if a session is
    /// already active; nothing changes in that case.
    pub async fn start(self: &Arc<Self>, output: OutputTarget) -> Result<(), Error> {
        let token = {
            let mut st = self.state.lock().await;
            if st.running {
                let bound = st.bound_output.clone().unwrap_or_default();
                debug!("Start from channel {output} rejected; already bound to {bound}");
                return Err(Error::AlreadyRunning(bound));
            }
            let token = CancellationToken::new();
            st.running = true;
            st.bound_output = Some(output.clone());
            st.ticker = Some(token.clone());
            token
        };
        info!("Milestone tracking started in channel {output}");

        self.publish_update(&token).await;
        self.arm_ticker(token).await;
        Ok(())
    }

    /// Spawns the ticker for `token` unless a `stop` already cancelled it.
    /// The state lock orders this check against `stop`.
    async fn arm_ticker(self: &Arc<Self>, token: CancellationToken) {
        let _guard = self.state.lock().await;
        if token.is_cancelled() {
            debug!("Session stopped before its ticker was armed");
            return;
        }
        spawn_milestone_loop(Arc::clone(self), token);
        debug!("Ticker armed with period {:?}", self.config.tick_period);
    }

    /// Disarms the ticker and unbinds the output. In-flight publishes finish
    /// their fetch but no longer deliver.
    pub async fn stop(&self) -> Result<(), Error> {
        let mut st = self.state.lock().await;
        if !st.running {
            return Err(Error::NotRunning);
        }
        if let Some(token) = st.ticker.take() {
            token.cancel();
        }
        let was_bound = st.bound_output.take();
        st.running = false;
        info!("Milestone tracking stopped (was bound to {:?})", was_bound);
        Ok(())
    }

    /// Runs one update step on demand, whether or not the session is
    /// running. The result also goes to the output bound when the call was
    /// made, if that binding is still live; running state is never touched.
    pub async fn status(&self) -> StatusReport {
        let token = self
            .state
            .lock()
            .await
            .ticker
            .clone()
            .unwrap_or_else(cancelled_token);
        self.publish_update(&token).await
    }

    /// Overrides the next milestone. Negative goals are rejected; a goal at
    /// or below the known visits is advanced right away. Returns the goal
    /// actually in effect.
    pub async fn set_goal(&self, value: i64) -> Result<u64, Error> {
        if value < 0 {
            return Err(Error::InvalidGoal(value));
        }
        let mut st = self.state.lock().await;
        st.milestone_goal = value as u64;
        self.advance_goal(&mut st);
        info!("Milestone goal set to {} (requested {value})", st.milestone_goal);
        Ok(st.milestone_goal)
    }

    /// One update step: fetch, clamp, advance, deliver.
    ///
    /// Delivery is skipped when `token` has been cancelled or no output is
    /// bound any more. Delivery failures are logged and otherwise ignored.
    pub(crate) async fn publish_update(&self, token: &CancellationToken) -> StatusReport {
        let snap = self.fetch().await;

        let (report, target) = {
            let mut st = self.state.lock().await;
            let report = self.absorb(&mut st, snap);
            let target = if token.is_cancelled() {
                None
            } else {
                st.bound_output.clone()
            };
            (report, target)
        };

        let Some(channel) = target else {
            debug!("No output bound; dropping update for {} visits", report.visits);
            return report;
        };

        let message = format_status_message(&report);
        if let Err(e) = self.publisher.publish(&channel, &message).await {
            let e = Error::DeliveryFailed(e.to_string());
            error!("Posting milestone update to channel {channel} failed => {e}");
        }
        report
    }

    async fn fetch(&self) -> MetricsSnapshot {
        let last_known = self.state.lock().await.last_known_visits;
        self.source.fetch(self.config.target_id, last_known).await
    }

    /// Clamps visits upward and advances the goal past them if reached.
    fn absorb(&self, st: &mut SessionState, snap: MetricsSnapshot) -> StatusReport {
        st.last_known_visits = st.last_known_visits.max(snap.visits);
        self.advance_goal(st);

        StatusReport {
            active_players: snap.active_players,
            visits: st.last_known_visits,
            milestone_goal: st.milestone_goal,
        }
    }

    fn advance_goal(&self, st: &mut SessionState) {
        if st.last_known_visits < st.milestone_goal {
            return;
        }
        let next = self
            .config
            .policy
            .next_goal(st.last_known_visits, &mut rand::rng());
        info!(
            "Milestone reached at {} visits! New goal: {next}",
            st.last_known_visits
        );
        st.milestone_goal = next;
    }
}

fn cancelled_token() -> CancellationToken {
    let token = CancellationToken::new();
    token.cancel();
    token
}
