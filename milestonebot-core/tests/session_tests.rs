// tests/session_tests.rs

mod test_utils;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;

use milestonebot_common::traits::Publisher;
use milestonebot_core::{Error, TrackingSession};
use milestonebot_core::session::MilestonePolicy;

use test_utils::{Fetch, RecordingPublisher, ScriptedSource, build_session, test_config};

mock! {
    ChatPublisher {}
    #[async_trait]
    impl Publisher for ChatPublisher {
        async fn publish(&self, channel: &str, message: &str) -> Result<(), Error>;
    }
}

#[tokio::test]
async fn test_first_milestone_scenario() -> Result<(), Error> {
    let source = Arc::new(ScriptedSource::new(vec![Fetch::Visits(3400)]));
    let publisher = Arc::new(RecordingPublisher::default());
    let session = build_session(source, publisher.clone(), MilestonePolicy::Fixed { choices: vec![100] });

    let before = session.view().await;
    assert_eq!(before.last_known_visits, 0);
    assert_eq!(before.milestone_goal, 3358);

    session.start("100".into()).await?;
    let after = session.view().await;
    assert_eq!(after.last_known_visits, 3400);
    assert_eq!(after.milestone_goal, 3500);

    let sent = publisher.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("🎯 Next milestone: 3,400/3,500"));

    session.stop().await
}

#[tokio::test]
async fn test_concurrent_starts_only_one_wins() -> Result<(), Error> {
    let source = Arc::new(ScriptedSource::new(vec![Fetch::Visits(10); 4]));
    let publisher = Arc::new(RecordingPublisher::default());
    let session = build_session(source, publisher.clone(), MilestonePolicy::default());

    let (a, b) = tokio::join!(session.start("111".into()), session.start("222".into()));

    let (winner, loser_err) = match (a, b) {
        (Ok(()), Err(e)) => ("111", e),
        (Err(e), Ok(())) => ("222", e),
        other => panic!("exactly one start should succeed, got {other:?}"),
    };
    match loser_err {
        Error::AlreadyRunning(bound) => assert_eq!(bound, winner),
        other => panic!("expected AlreadyRunning, got {other:?}"),
    }

    assert_eq!(session.view().await.bound_output.as_deref(), Some(winner));
    let sent = publisher.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, winner);

    session.stop().await
}

#[tokio::test(start_paused = true)]
async fn test_stop_suppresses_in_flight_tick() -> Result<(), Error> {
    let (source, gate) = ScriptedSource::gated(vec![Fetch::Visits(3000), Fetch::Visits(3100)]);
    let source = Arc::new(source);
    let entered = source.entered.clone();
    let publisher = Arc::new(RecordingPublisher::default());
    let session = build_session(source.clone(), publisher.clone(), MilestonePolicy::default());

    // Immediate publish on start.
    let s2 = session.clone();
    let start = tokio::spawn(async move { s2.start("555".into()).await });
    entered.notified().await;
    gate.notify_one();
    start.await.expect("start task panicked")?;
    assert_eq!(publisher.sent().len(), 1);

    // Wait until the first tick is parked inside its fetch, then stop.
    entered.notified().await;
    session.stop().await?;
    gate.notify_one();

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(publisher.sent().len(), 1, "stopped session must not deliver");

    // The fetch still counts towards the monotonic visit counter.
    assert_eq!(session.view().await.last_known_visits, 3100);
    assert_eq!(source.calls.lock().unwrap().len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stop_racing_start_leaves_session_stopped() -> Result<(), Error> {
    let (source, gate) = ScriptedSource::gated(vec![Fetch::Visits(3000)]);
    let source = Arc::new(source);
    let entered = source.entered.clone();
    let publisher = Arc::new(RecordingPublisher::default());
    let session = build_session(source.clone(), publisher.clone(), MilestonePolicy::default());

    let s2 = session.clone();
    let start = tokio::spawn(async move { s2.start("777".into()).await });

    // Start's immediate fetch is in flight; stop wins the race.
    entered.notified().await;
    session.stop().await?;
    gate.notify_one();
    start.await.expect("start task panicked")?;

    let view = session.view().await;
    assert!(!view.running);
    assert_eq!(view.bound_output, None);

    // No delivery and no ticker left behind.
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert!(publisher.sent().is_empty());
    assert_eq!(source.calls.lock().unwrap().len(), 1);

    // A fresh start works afterwards.
    let s3 = session.clone();
    let restart = tokio::spawn(async move { s3.start("888".into()).await });
    entered.notified().await;
    gate.notify_one();
    restart.await.expect("restart task panicked")?;
    assert!(session.is_running().await);
    session.stop().await
}

#[tokio::test(start_paused = true)]
async fn test_delivery_failures_keep_ticker_alive() -> Result<(), Error> {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();

    let mut publisher = MockChatPublisher::new();
    publisher
        .expect_publish()
        .withf(|channel: &str, _message: &str| channel == "999")
        .returning(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::DeliveryFailed("Missing Access".into()))
        });

    let source = Arc::new(ScriptedSource::new(vec![Fetch::Visits(3000); 5]));
    let session = build_session(source, Arc::new(publisher), MilestonePolicy::default());

    session.start("999".into()).await?;
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(131)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(session.is_running().await);

    session.stop().await
}

#[tokio::test(start_paused = true)]
async fn test_visits_monotonic_across_ticks_and_failures() -> Result<(), Error> {
    let script = vec![
        Fetch::Visits(5000),
        Fetch::Fail,
        Fetch::Visits(4200),
        Fetch::Visits(5300),
        Fetch::Fail,
        Fetch::Visits(100),
    ];
    let source = Arc::new(ScriptedSource::new(script));
    let publisher = Arc::new(RecordingPublisher::default());
    let session = build_session(source, publisher.clone(), MilestonePolicy::Percent { percent: 5 });

    session.start("1".into()).await?;
    let mut last = session.view().await.last_known_visits;
    assert_eq!(last, 5000);

    // Offset by a second so reads never land on a tick boundary.
    tokio::time::sleep(Duration::from_secs(1)).await;
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_secs(65)).await;
        let view = session.view().await;
        assert!(view.last_known_visits >= last);
        assert!(view.milestone_goal > view.last_known_visits);
        last = view.last_known_visits;
    }
    session.stop().await?;

    assert_eq!(last, 5300);
    let sent = publisher.sent();
    assert_eq!(sent.len(), 6);
    assert!(sent.iter().skip(3).all(|(_, msg)| msg.contains("👥 Visits: 5,300")));
    Ok(())
}

#[tokio::test]
async fn test_status_works_while_stopped() {
    let source = Arc::new(ScriptedSource::new(vec![Fetch::Fail]));
    let publisher = Arc::new(RecordingPublisher::default());
    let session = build_session(source, publisher.clone(), MilestonePolicy::Fixed { choices: vec![150] });

    let report = session.status().await;
    assert_eq!(report.active_players, 9);
    assert_eq!(report.visits, 3258);
    assert_eq!(report.milestone_goal, 3358);
    assert!(publisher.sent().is_empty());
    assert!(!session.is_running().await);
}

fn jittered_session(
    jitter: Duration,
) -> (Arc<TrackingSession>, Arc<ScriptedSource>, Arc<RecordingPublisher>) {
    let source = Arc::new(ScriptedSource::new(vec![Fetch::Visits(3400); 4]));
    let publisher = Arc::new(RecordingPublisher::default());
    let mut config = test_config(MilestonePolicy::default());
    config.tick_jitter = jitter;
    let session = Arc::new(TrackingSession::new(config, source.clone(), publisher.clone()));
    (session, source, publisher)
}

#[tokio::test(start_paused = true)]
async fn test_jittered_tick_lands_between_period_and_period_plus_jitter() -> Result<(), Error> {
    let (session, _, publisher) = jittered_session(Duration::from_secs(5));

    session.start("42".into()).await?;
    assert_eq!(publisher.sent().len(), 1);

    tokio::time::sleep(Duration::from_millis(64_999)).await;
    assert_eq!(publisher.sent().len(), 1);

    tokio::time::sleep(Duration::from_millis(5_002)).await;
    assert_eq!(publisher.sent().len(), 2);

    session.stop().await
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_jitter_sleep_skips_the_tick() -> Result<(), Error> {
    let (session, source, publisher) = jittered_session(Duration::from_secs(3600));

    session.start("42".into()).await?;
    // Just past the first tick: the loop is now waiting out its jitter.
    tokio::time::sleep(Duration::from_millis(65_002)).await;
    assert_eq!(source.calls.lock().unwrap().len(), 1);

    session.stop().await?;
    tokio::time::sleep(Duration::from_secs(2 * 3600)).await;

    assert_eq!(source.calls.lock().unwrap().len(), 1);
    assert_eq!(publisher.sent().len(), 1);
    Ok(())
}
