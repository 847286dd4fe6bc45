// File: milestonebot-core/tests/test_utils/mod.rs
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use milestonebot_common::models::MetricsSnapshot;
use milestonebot_common::traits::{MetricsSource, Publisher};
use milestonebot_core::Error;
use milestonebot_core::TrackingSession;
use milestonebot_core::config::SessionConfig;
use milestonebot_core::session::MilestonePolicy;

/// One scripted fetch outcome.
#[derive(Debug, Clone, Copy)]
pub enum Fetch {
    Visits(u64),
    /// Upstream fault: reply like the real source's fallback would.
    Fail,
}

/// Replays a script of fetches. When `gate` is set, every fetch parks until
/// the test calls `release()`.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Fetch>>,
    pub floor: u64,
    pub calls: Mutex<Vec<u64>>,
    gate: Option<Arc<Notify>>,
    pub entered: Arc<Notify>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Fetch>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            floor: 3258,
            calls: Mutex::new(Vec::new()),
            gate: None,
            entered: Arc::new(Notify::new()),
        }
    }

    pub fn gated(script: Vec<Fetch>) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let mut me = Self::new(script);
        me.gate = Some(gate.clone());
        (me, gate)
    }
}

#[async_trait]
impl MetricsSource for ScriptedSource {
    async fn fetch(&self, _target_id: u64, last_known_visits: u64) -> MetricsSnapshot {
        self.calls.lock().unwrap().push(last_known_visits);
        let next = self.script.lock().unwrap().pop_front().unwrap_or(Fetch::Fail);
        if let Some(gate) = &self.gate {
            self.entered.notify_one();
            gate.notified().await;
        }
        match next {
            Fetch::Visits(v) => MetricsSnapshot::live(42, v),
            Fetch::Fail => MetricsSnapshot::fallback(9, last_known_visits.max(self.floor)),
        }
    }
}

/// Records every delivered message.
#[derive(Default)]
pub struct RecordingPublisher {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingPublisher {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), Error> {
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), message.to_string()));
        Ok(())
    }
}

pub fn test_config(policy: MilestonePolicy) -> SessionConfig {
    SessionConfig {
        target_id: 4242,
        initial_goal: 3358,
        policy,
        tick_period: Duration::from_secs(65),
        tick_jitter: Duration::ZERO,
    }
}

pub fn build_session(
    source: Arc<dyn MetricsSource>,
    publisher: Arc<dyn Publisher>,
    policy: MilestonePolicy,
) -> Arc<TrackingSession> {
    Arc::new(TrackingSession::new(test_config(policy), source, publisher))
}
