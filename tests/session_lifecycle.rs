mod common;

use std::time::Duration;

use common::{fast_ticks, wait_for_status, Harness};
use monkmode_lib::{AppPhase, SessionConfig, SessionStatus, TimerError, TimerEvent};

fn reading(secs: u64) -> SessionConfig {
    SessionConfig::new(secs)
        .unwrap()
        .with_subject("book-42", Some("Walden".into()))
}

#[tokio::test]
async fn pause_for_ten_minutes_then_finish() {
    let h = Harness::new();
    let timer = h.controller();

    let started = timer.start(reading(1500)).await.unwrap();
    assert_eq!(started.status, SessionStatus::Running);
    assert_eq!(started.remaining_seconds, 1500);
    assert_eq!(h.alerts.live_delays(), vec![1500]);

    h.clock.advance_secs(300);
    let paused = timer.pause().await.unwrap();
    assert_eq!(paused.status, SessionStatus::Paused);
    assert_eq!(paused.remaining_seconds, 1200);
    assert!(h.alerts.live_delays().is_empty());

    h.clock.advance_secs(600);
    assert_eq!(timer.snapshot().await.remaining_seconds, 1200);

    let resumed = timer.resume().await.unwrap();
    assert_eq!(resumed.status, SessionStatus::Running);
    assert_eq!(resumed.remaining_seconds, 1200);
    assert_eq!(resumed.timestamps.cumulative_paused_ms, 600_000);
    assert_eq!(h.alerts.live_delays(), vec![1200]);

    timer.flush().await;
    let record = h.store().load().unwrap().unwrap();
    assert_eq!(record.status, SessionStatus::Running);
    assert_eq!(record.timestamps.cumulative_paused_ms, 600_000);
    assert_eq!(record.timestamps.started_at_ms, common::T0);

    h.clock.advance_secs(1199);
    assert_eq!(timer.resync().await.remaining_seconds, 1);
    assert!(h.sink.calls().is_empty());

    h.clock.advance_secs(1);
    let done = timer.on_lifecycle(AppPhase::Foreground).await;
    assert_eq!(done.status, SessionStatus::Completed);
    assert_eq!(done.remaining_seconds, 0);
    assert_eq!(h.sink.calls(), vec![(1500, Some("book-42".to_string()))]);

    timer.flush().await;
    assert!(h.store().load().unwrap().is_none());
    assert!(h.alerts.live_delays().is_empty());
}

#[tokio::test]
async fn cancel_clears_record_and_alert_without_crediting() {
    let h = Harness::new();
    let timer = h.controller();

    timer.start(reading(600)).await.unwrap();
    let handle = h.alerts.live_handles()[0].clone();
    h.clock.advance_secs(100);

    let cancelled = timer.cancel().await.unwrap();
    assert_eq!(cancelled.status, SessionStatus::Idle);

    timer.flush().await;
    assert!(h.store().load().unwrap().is_none());
    assert!(h.alerts.cancelled().contains(&handle));
    assert!(h.alerts.live_delays().is_empty());

    h.clock.advance_secs(10_000);
    timer.resync().await;
    assert!(h.sink.calls().is_empty());
    assert!(timer.cancel().await.is_err());
}

#[tokio::test]
async fn cancel_while_paused() {
    let h = Harness::new();
    let timer = h.controller();

    timer.start(reading(600)).await.unwrap();
    timer.pause().await.unwrap();
    timer.cancel().await.unwrap();
    timer.flush().await;

    assert_eq!(timer.status().await, SessionStatus::Idle);
    assert!(h.store().load().unwrap().is_none());
}

#[tokio::test]
async fn repeated_pause_resume_keeps_one_alert() {
    let h = Harness::new();
    let timer = h.controller();
    timer.start(reading(900)).await.unwrap();

    for _ in 0..5 {
        h.clock.advance_secs(60);
        timer.pause().await.unwrap();
        h.clock.advance_secs(30);
        let resumed = timer.resume().await.unwrap();
        let live = h.alerts.live_delays();
        assert_eq!(live, vec![resumed.remaining_seconds]);
    }
    assert_eq!(timer.snapshot().await.remaining_seconds, 600);
    // One alert at start plus one per resume.
    assert_eq!(h.alerts.issued(), 6);
}

#[tokio::test]
async fn tick_completes_the_session() {
    let h = Harness::new();
    let timer = h.controller_with(fast_ticks());
    let mut events = timer.subscribe();

    timer.start(reading(2)).await.unwrap();
    h.clock.advance_secs(2);
    assert!(wait_for_status(&timer, SessionStatus::Completed, Duration::from_secs(2)).await);

    let mut completions = 0;
    while let Ok(event) = events.try_recv() {
        if let TimerEvent::Completed {
            duration_seconds, ..
        } = event
        {
            assert_eq!(duration_seconds, 2);
            completions += 1;
        }
    }
    assert_eq!(completions, 1);
    assert_eq!(h.sink.calls().len(), 1);

    // A foreground resync racing the tick changes nothing.
    timer.on_lifecycle(AppPhase::Foreground).await;
    assert_eq!(h.sink.calls().len(), 1);
}

#[tokio::test]
async fn ticks_publish_remaining_time() {
    let h = Harness::new();
    let timer = h.controller_with(fast_ticks());
    let mut events = timer.subscribe();

    timer.start(reading(60)).await.unwrap();
    h.clock.advance_secs(15);

    let remaining = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(TimerEvent::Tick {
                remaining_seconds, ..
            }) = events.recv().await
            {
                if remaining_seconds == 45 {
                    return remaining_seconds;
                }
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(remaining, 45);
}

#[tokio::test]
async fn pause_stops_ticking() {
    let h = Harness::new();
    let timer = h.controller_with(fast_ticks());

    timer.start(reading(5)).await.unwrap();
    timer.pause().await.unwrap();
    h.clock.advance_secs(60);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = timer.snapshot().await;
    assert_eq!(snapshot.status, SessionStatus::Paused);
    assert_eq!(snapshot.remaining_seconds, 5);
    assert!(h.sink.calls().is_empty());
}

#[tokio::test]
async fn background_does_not_disturb_session() {
    let h = Harness::new();
    let timer = h.controller();

    timer.start(reading(300)).await.unwrap();
    timer.on_lifecycle(AppPhase::Background).await;
    h.clock.advance_secs(301);

    // Nothing ticked while "suspended"; foreground catches up from timestamps.
    let snapshot = timer.on_lifecycle(AppPhase::Foreground).await;
    assert_eq!(snapshot.status, SessionStatus::Completed);
    assert_eq!(h.sink.calls().len(), 1);
}

#[tokio::test]
async fn silent_session_when_notifications_unavailable() {
    let h = Harness::new();
    h.alerts.deny(true);
    let timer = h.controller();

    timer.start(reading(30)).await.unwrap();
    timer.flush().await;
    let record = h.store().load().unwrap().unwrap();
    assert!(record.notification.is_none());

    h.clock.advance_secs(30);
    assert_eq!(timer.resync().await.status, SessionStatus::Completed);
    assert_eq!(h.sink.calls().len(), 1);
}

#[tokio::test]
async fn storage_failures_do_not_stop_the_timer() {
    let h = Harness::new();
    h.kv.fail_writes(true);
    let timer = h.controller();

    timer.start(reading(30)).await.unwrap();
    timer.pause().await.unwrap();
    timer.resume().await.unwrap();
    timer.flush().await;
    assert!(h.store().load().unwrap().is_none());
    assert_eq!(timer.status().await, SessionStatus::Running);

    h.clock.advance_secs(30);
    assert_eq!(timer.resync().await.status, SessionStatus::Completed);
    assert_eq!(h.sink.calls().len(), 1);
}

#[tokio::test]
async fn state_changes_are_broadcast() {
    let h = Harness::new();
    let timer = h.controller();
    let mut events = timer.subscribe();

    timer.start(reading(120)).await.unwrap();
    timer.pause().await.unwrap();

    let mut statuses = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let TimerEvent::StateChanged(snapshot) = event {
            statuses.push(snapshot.status);
        }
    }
    assert_eq!(statuses, vec![SessionStatus::Running, SessionStatus::Paused]);
}

#[tokio::test]
async fn invalid_transition_leaves_state_alone() {
    let h = Harness::new();
    let timer = h.controller();
    timer.start(reading(120)).await.unwrap();
    timer.pause().await.unwrap();

    let err = timer.pause().await.unwrap_err();
    assert_eq!(
        err,
        TimerError::InvalidState {
            action: "pause",
            status: SessionStatus::Paused
        }
    );
    assert_eq!(timer.status().await, SessionStatus::Paused);
}
