//! End-to-end scenarios, driven by wire-format host messages.

use pretty_assertions::assert_eq;
use tether::app::{UserAction, ViewEvent};
use tether::channel::Outbound;
use tether::notices::NoticeKind;
use tether::permissions::PermissionResponse;
use tether::types::config::DEFAULT_EXECUTE_DIRECTIVE;
use tether::usage::ContextBand;

use crate::common::{round_trip, send_message, Harness};

/// "fix bug": request, permission round trip, streamed output, completion.
#[test]
fn test_fix_bug() {
    let mut h = Harness::new();
    h.send("fix bug");
    h.host_line(r#"{"type":"setProcessing","data":{"isProcessing":true,"requestStartTime":1718000000000}}"#);
    h.host_line(r#"{"type":"permissionRequest","data":{"id":"perm-1","tool":"Edit","pattern":"src/lib.rs"}}"#);
    assert!(h.state.busy());

    h.user(UserAction::ResolvePermission {
        id: "perm-1".to_string(),
        response: PermissionResponse::AllowOnce,
    });
    h.host_line(r#"{"type":"output","data":"Fixed the off-by-one in parse()."}"#);
    h.host_line(r#"{"type":"updateTotals","data":{"totalCost":0.0042,"totalTokensInput":900,"totalTokensOutput":334,"requestCount":1}}"#);
    h.host_line(r#"{"type":"setProcessing","data":{"isProcessing":false}}"#);

    assert_eq!(
        h.sent(),
        vec![
            send_message("fix bug", false),
            Outbound::PermissionResponse {
                id: "perm-1".to_string(),
                approved: true,
                always_allow: false,
            },
        ]
    );
    assert!(!h.state.busy());
    assert_eq!(
        h.state.transcript.get(0).unwrap().output,
        "Fixed the off-by-one in parse()."
    );
    assert_eq!(h.state.status_line(h.now), "Ready · 1,234 tokens · $0.0042");
    assert_eq!(h.busy_trace.first(), Some(&true));
    assert_eq!(h.busy_trace.last(), Some(&false));
}

/// AutoMode: plan, hand-off, execute, done.
#[test]
fn test_automode_build_feature() {
    let mut h = Harness::new();
    h.user(UserAction::StartAutoMode {
        text: "build feature X".to_string(),
    });
    h.host_line(r#"{"type":"setProcessing","data":{"isProcessing":true}}"#);
    h.host_line(r#"{"type":"output","data":"Plan: 1. model 2. api 3. tests"}"#);
    h.host_line(r#"{"type":"setProcessing","data":{"isProcessing":false}}"#);
    h.host_line(r#"{"type":"setProcessing","data":{"isProcessing":true}}"#);
    h.host_line(r#"{"type":"output","data":"Implemented all three steps."}"#);
    h.host_line(r#"{"type":"setProcessing","data":{"isProcessing":false}}"#);

    let sends = h.sent();
    assert_eq!(sends.len(), 2);
    assert!(matches!(&sends[0], Outbound::SendMessage { plan_mode: true, text, .. } if text.ends_with("build feature X")));
    assert_eq!(sends[1], send_message(DEFAULT_EXECUTE_DIRECTIVE, false));

    // Busy from the first event to the last completion, never in between.
    let (last, rest) = h.busy_trace.split_last().unwrap();
    assert!(rest.iter().all(|busy| *busy));
    assert!(!last);

    let busy_changes: Vec<_> = h
        .views()
        .into_iter()
        .filter(|v| matches!(v, ViewEvent::BusyChanged { .. }))
        .collect();
    assert_eq!(
        busy_changes,
        vec![
            ViewEvent::BusyChanged { busy: true },
            ViewEvent::BusyChanged { busy: false }
        ]
    );
    assert!(h.notice_texts().contains(&"AutoMode finished".to_string()));
}

/// Edit turn #3 of 5: rollback, purge of turns 3..5, resubmission.
#[test]
fn test_edit_third_of_five_turns() {
    let mut h = Harness::new();
    for i in 1..=5 {
        round_trip(&mut h, &format!("step {}", i));
    }
    assert_eq!(h.state.transcript.len(), 5);
    h.clear_effects();

    h.user(UserAction::BeginEdit { index: 2 });
    h.user(UserAction::ConfirmEdit {
        text: "step 3, but with retries".to_string(),
    });
    h.host_line(r#"{"type":"editRestoreComplete","data":{"success":true,"messageIndex":2,"editedContent":"step 3, but with retries","filesRestored":4}}"#);

    assert_eq!(
        h.sent(),
        vec![
            Outbound::EditAndRestorePrompt {
                message_index: 2,
                edited_content: "step 3, but with retries".to_string(),
                original_content: "step 3".to_string(),
            },
            send_message("step 3, but with retries", false),
        ]
    );
    let prompts: Vec<&str> = h
        .state
        .transcript
        .turns()
        .iter()
        .map(|t| t.prompt.as_str())
        .collect();
    assert_eq!(prompts, vec!["step 1", "step 2", "step 3, but with retries"]);
    assert_eq!(h.state.transcript.next_index(), 3);
    assert!(h.state.busy());
}

/// 96 % context: warning band crossed, auto-compaction notice, result.
#[test]
fn test_context_at_96_percent() {
    let mut h = Harness::new();
    h.host_line(r#"{"type":"contextStats","data":{"totalTokens":172000,"maxTokens":200000}}"#);
    assert_eq!(h.state.usage.context().band(), ContextBand::Warning);

    h.host_line(r#"{"type":"contextStats","data":{"totalTokens":192000,"maxTokens":200000}}"#);
    assert_eq!(h.state.usage.context().band(), ContextBand::Critical);
    let compacting: Vec<_> = h
        .state
        .notices
        .iter()
        .filter(|n| n.kind == NoticeKind::Compacting)
        .collect();
    assert_eq!(compacting.len(), 1);
    assert_eq!(compacting[0].text, "Context at 96%, auto-compacting…");

    h.host_line(r#"{"type":"contextCompacted","data":{"success":true,"compressionRatio":0.7,"messagesCompressed":30,"stats":{"totalTokens":57600,"maxTokens":200000}}}"#);
    assert_eq!(h.state.usage.context().band(), ContextBand::Healthy);
    let texts: Vec<_> = h.state.notices.iter().map(|n| n.text.clone()).collect();
    assert_eq!(
        texts,
        vec!["Context compacted: 70% smaller, 30 messages summarized".to_string()]
    );
}
