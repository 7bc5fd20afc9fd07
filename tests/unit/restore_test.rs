//! Edit-and-restore tests through the reducer.

use pretty_assertions::assert_eq;
use tether::app::{UserAction, ViewEvent};
use tether::channel::protocol::RestoreReport;
use tether::channel::{Inbound, Outbound};

use crate::common::{processing, round_trip, send_message, Harness};

fn restored(index: usize, success: bool) -> Inbound {
    Inbound::EditRestoreComplete(RestoreReport {
        success,
        message_index: index,
        edited_content: String::new(),
        files_restored: 3,
        error: (!success).then(|| "checkpoint missing".to_string()),
    })
}

fn with_turns(n: usize) -> Harness {
    let mut h = Harness::new();
    for i in 0..n {
        round_trip(&mut h, &format!("turn {}", i));
    }
    h.clear_effects();
    h
}

fn edit(h: &mut Harness, index: usize, text: &str) {
    h.user(UserAction::BeginEdit { index });
    h.user(UserAction::ConfirmEdit {
        text: text.to_string(),
    });
}

#[test]
fn test_begin_edit_opens_draft() {
    let mut h = with_turns(2);
    h.user(UserAction::BeginEdit { index: 1 });
    assert_eq!(
        h.views(),
        vec![ViewEvent::DraftOpened {
            index: 1,
            text: "turn 1".to_string()
        }]
    );
}

#[test]
fn test_begin_edit_unknown_turn() {
    let mut h = with_turns(1);
    h.user(UserAction::BeginEdit { index: 7 });
    assert_eq!(h.notice_texts(), vec!["No turn #7".to_string()]);
    assert!(h.state.restore.draft().is_none());
}

#[test]
fn test_confirm_sends_restore_prompt() {
    let mut h = with_turns(3);
    edit(&mut h, 1, "turn 1 again");
    assert_eq!(
        h.sent(),
        vec![Outbound::EditAndRestorePrompt {
            message_index: 1,
            edited_content: "turn 1 again".to_string(),
            original_content: "turn 1".to_string(),
        }]
    );
    assert!(h.state.restore.is_pending());
}

#[test]
fn test_sends_rejected_while_restore_pending() {
    let mut h = with_turns(2);
    edit(&mut h, 0, "again");
    h.clear_effects();
    h.send("something else");
    assert!(h.sent().is_empty());
    assert_eq!(
        h.notice_texts(),
        vec!["An edit is being restored".to_string()]
    );
}

#[test]
fn test_success_purges_then_resubmits_once() {
    let mut h = with_turns(3);
    edit(&mut h, 1, "better turn 1");
    h.clear_effects();

    h.host(restored(1, true));

    let views = h.views();
    let purge = views
        .iter()
        .position(|v| matches!(v, ViewEvent::TranscriptPurged { from: 1, count: 2 }))
        .expect("purge view");
    let started = views
        .iter()
        .position(|v| matches!(v, ViewEvent::TurnStarted { index: 1, .. }))
        .expect("resubmitted turn");
    assert!(purge < started, "purge happens before resubmission");

    assert_eq!(h.sent(), vec![send_message("better turn 1", false)]);
    assert_eq!(h.state.transcript.len(), 2);
    assert_eq!(h.state.transcript.get(1).unwrap().prompt, "better turn 1");
    assert!(h.notice_texts().contains(&"Restored 3 file(s)".to_string()));

    // A repeated report does nothing.
    h.clear_effects();
    h.host(restored(1, true));
    assert!(h.sent().is_empty());
}

#[test]
fn test_resubmits_even_if_host_started_during_rollback() {
    let mut h = with_turns(3);
    edit(&mut h, 1, "better turn 1");
    h.host(processing(true));
    h.clear_effects();

    h.host(restored(1, true));

    assert_eq!(h.sent(), vec![send_message("better turn 1", false)]);
    let prompts: Vec<&str> = h
        .state
        .transcript
        .turns()
        .iter()
        .map(|t| t.prompt.as_str())
        .collect();
    assert_eq!(prompts, vec!["turn 0", "better turn 1"]);
    assert!(h.state.busy());
}

#[test]
fn test_failure_keeps_transcript_and_reopens_draft() {
    let mut h = with_turns(3);
    edit(&mut h, 2, "new");
    h.clear_effects();

    h.host(restored(2, false));
    assert_eq!(h.state.transcript.len(), 3);
    assert!(h.sent().is_empty());
    assert!(h.views().contains(&ViewEvent::DraftOpened {
        index: 2,
        text: "turn 2".to_string()
    }));
    assert_eq!(
        h.notice_texts(),
        vec!["restore: turn 2 could not be restored: checkpoint missing".to_string()]
    );

    // The user can retry straight away.
    h.user(UserAction::ConfirmEdit {
        text: "new".to_string(),
    });
    assert_eq!(h.sent().len(), 1);
}

#[test]
fn test_mismatched_index_is_ignored() {
    let mut h = with_turns(3);
    edit(&mut h, 1, "x");
    h.clear_effects();
    h.host(restored(2, true));
    assert!(h.effects.is_empty());
    assert!(h.state.restore.is_pending());
}

#[test]
fn test_cancel_in_flight_purges_without_resubmit() {
    let mut h = with_turns(3);
    edit(&mut h, 1, "x");
    h.user(UserAction::CancelEdit);
    h.clear_effects();

    h.host(restored(1, true));
    assert_eq!(h.state.transcript.len(), 1);
    assert!(h.sent().is_empty());
}

#[test]
fn test_edit_rejected_while_busy() {
    let mut h = with_turns(1);
    h.send("in flight");
    h.host(processing(true));
    h.clear_effects();

    h.user(UserAction::BeginEdit { index: 0 });
    assert!(h.state.restore.draft().is_none());
    assert_eq!(h.notice_texts(), vec!["Cannot edit while busy".to_string()]);
}
