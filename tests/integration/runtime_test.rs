//! Runtime tests: ticker, notice timers and channel handling.
//!
//! Time is paused, so timers fire deterministically as the clock advances.

use std::time::Duration;

use tether::app::{Runtime, UserAction, ViewEvent};
use tether::channel::{Outbound, RecordingOutbox};
use tether::types::Config;
use tokio::sync::{broadcast, mpsc};
use tokio::time;

use crate::common::{processing, send_message};

fn drain(views: &mut broadcast::Receiver<ViewEvent>) -> Vec<ViewEvent> {
    let mut out = Vec::new();
    while let Ok(event) = views.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_sends_through_outbox() {
    let mut runtime = Runtime::new(Config::default(), RecordingOutbox::new());
    runtime.dispatch(UserAction::Send {
        text: "fix bug".to_string(),
    });

    assert_eq!(runtime.outbox().sent(), &[send_message("fix bug", false)]);
    assert!(runtime.ticker_active());

    runtime.dispatch(processing(false));
    assert!(!runtime.ticker_active());
}

#[tokio::test(start_paused = true)]
async fn test_status_ticks_while_processing() {
    let (inbound_tx, inbound_rx) = mpsc::channel(8);
    let (actions_tx, actions_rx) = mpsc::channel(8);

    let runtime = Runtime::new(Config::default(), RecordingOutbox::new());
    let mut views = runtime.subscribe();
    let task = tokio::spawn(runtime.run(inbound_rx, actions_rx));

    actions_tx
        .send(UserAction::Send {
            text: "x".to_string(),
        })
        .await
        .unwrap();
    time::sleep(Duration::from_millis(350)).await;

    let statuses: Vec<String> = drain(&mut views)
        .into_iter()
        .filter_map(|v| match v {
            ViewEvent::Status { line } => Some(line),
            _ => None,
        })
        .collect();
    // One from the busy transition, then one per 100 ms tick.
    assert!(statuses.len() >= 4, "got {:?}", statuses);
    assert!(statuses.iter().any(|s| s.starts_with("Processing · 0.3s")));

    inbound_tx.send(processing(false)).await.unwrap();
    time::sleep(Duration::from_millis(50)).await;
    drain(&mut views);
    time::sleep(Duration::from_millis(500)).await;
    assert!(
        !drain(&mut views)
            .iter()
            .any(|v| matches!(v, ViewEvent::Status { .. })),
        "no ticks once idle"
    );

    drop(actions_tx);
    let runtime = task.await.unwrap();
    assert!(!runtime.ticker_active());
    drop(inbound_tx);
}

#[tokio::test(start_paused = true)]
async fn test_notices_expire_after_ttl() {
    let (_inbound_tx, inbound_rx) = mpsc::channel(8);
    let (actions_tx, actions_rx) = mpsc::channel(8);

    let config = Config::default().with_notice_ttl(Duration::from_secs(4));
    let runtime = Runtime::new(config, RecordingOutbox::new());
    let mut views = runtime.subscribe();
    let task = tokio::spawn(runtime.run(inbound_rx, actions_rx));

    actions_tx.send(UserAction::TogglePlanMode).await.unwrap();
    time::sleep(Duration::from_secs(1)).await;
    let shown = drain(&mut views)
        .into_iter()
        .find_map(|v| match v {
            ViewEvent::NoticeShown { id, .. } => Some(id),
            _ => None,
        })
        .expect("notice shown");

    time::sleep(Duration::from_secs(4)).await;
    assert!(drain(&mut views).contains(&ViewEvent::NoticeDismissed { id: shown }));

    drop(actions_tx);
    let runtime = task.await.unwrap();
    assert!(runtime.state().notices.is_empty());
    assert_eq!(runtime.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_new_session_cancels_timers() {
    let mut runtime = Runtime::new(Config::default(), RecordingOutbox::new());
    runtime.dispatch(UserAction::TogglePlanMode);
    runtime.dispatch(UserAction::ToggleThinkingMode);
    assert_eq!(runtime.pending_timers(), 2);

    runtime.dispatch(UserAction::NewSession);
    assert_eq!(runtime.pending_timers(), 0);
    assert_eq!(runtime.outbox().sent().last(), Some(&Outbound::NewSession {}));
}

#[tokio::test(start_paused = true)]
async fn test_run_ends_when_host_closes() {
    let (inbound_tx, inbound_rx) = mpsc::channel(8);
    let (_actions_tx, actions_rx) = mpsc::channel::<UserAction>(8);

    let runtime = Runtime::new(Config::default(), RecordingOutbox::new());
    let task = tokio::spawn(runtime.run(inbound_rx, actions_rx));

    inbound_tx.send(processing(true)).await.unwrap();
    drop(inbound_tx);

    let runtime = time::timeout(Duration::from_secs(1), task)
        .await
        .expect("runtime stops")
        .unwrap();
    assert!(!runtime.ticker_active(), "shutdown stops the ticker");
}
