//! Permission correlation through the reducer.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tether::app::{UserAction, ViewEvent};
use tether::channel::{Inbound, Outbound, SettingsPatch};
use tether::permissions::{PermissionRegistry, PermissionResponse, Registration};

use crate::common::Harness;

fn request(id: &str) -> Inbound {
    Inbound::PermissionRequest {
        id: id.to_string(),
        tool: "Bash".to_string(),
        pattern: Some("cargo test".to_string()),
    }
}

fn responses(h: &Harness) -> Vec<Outbound> {
    h.sent()
        .into_iter()
        .filter(|m| matches!(m, Outbound::PermissionResponse { .. }))
        .collect()
}

#[test]
fn test_request_prompts_user() {
    let mut h = Harness::new();
    h.host(request("p-1"));
    assert_eq!(
        h.views(),
        vec![ViewEvent::PermissionPrompt {
            id: "p-1".to_string(),
            description: "Bash wants to run `cargo test`".to_string(),
        }]
    );
    assert!(h.sent().is_empty());
}

#[test]
fn test_double_click_sends_one_response() {
    let mut h = Harness::new();
    h.host(request("p-1"));
    for _ in 0..3 {
        h.user(UserAction::ResolvePermission {
            id: "p-1".to_string(),
            response: PermissionResponse::AllowOnce,
        });
    }
    h.user(UserAction::ResolvePermission {
        id: "p-1".to_string(),
        response: PermissionResponse::Deny,
    });

    assert_eq!(
        responses(&h),
        vec![Outbound::PermissionResponse {
            id: "p-1".to_string(),
            approved: true,
            always_allow: false,
        }]
    );
}

#[test]
fn test_enable_auto_approve_sends_response_and_policy() {
    let mut h = Harness::new();
    h.host(request("p-1"));
    h.user(UserAction::EnableAutoApprove {
        id: "p-1".to_string(),
    });

    assert_eq!(
        h.sent(),
        vec![
            Outbound::PermissionResponse {
                id: "p-1".to_string(),
                approved: true,
                always_allow: false,
            },
            Outbound::UpdateSettings {
                settings: SettingsPatch::auto_approve(),
            },
        ]
    );

    // Later requests are answered without a prompt.
    h.clear_effects();
    h.host(request("p-2"));
    assert_eq!(responses(&h).len(), 1);
    assert!(!h
        .views()
        .iter()
        .any(|v| matches!(v, ViewEvent::PermissionPrompt { .. })));
}

#[test]
fn test_unknown_id_is_noop() {
    let mut h = Harness::new();
    h.user(UserAction::ResolvePermission {
        id: "ghost".to_string(),
        response: PermissionResponse::AllowOnce,
    });
    assert!(h.sent().is_empty());
}

#[test]
fn test_new_session_clears_requests() {
    let mut h = Harness::new();
    h.host(request("p-1"));
    h.user(UserAction::NewSession);
    assert_eq!(h.state.permissions.pending().count(), 0);
    h.clear_effects();
    h.user(UserAction::ResolvePermission {
        id: "p-1".to_string(),
        response: PermissionResponse::AllowOnce,
    });
    assert!(responses(&h).is_empty());
}

#[derive(Debug, Clone)]
enum Op {
    Register(u8),
    Resolve(u8, u8),
    EnableAuto(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..5).prop_map(Op::Register),
        (0u8..5, 0u8..3).prop_map(|(id, r)| Op::Resolve(id, r)),
        (0u8..5).prop_map(Op::EnableAuto),
    ]
}

proptest! {
    /// However requests and answers interleave, each id gets at most one
    /// permissionResponse.
    #[test]
    fn prop_each_id_answered_at_most_once(ops in prop::collection::vec(op(), 0..40)) {
        let mut registry = PermissionRegistry::new();
        let mut sent = Vec::new();

        for op in ops {
            match op {
                Op::Register(id) => {
                    if let Registration::AutoApproved(m) =
                        registry.register(&id.to_string(), "Bash", None)
                    {
                        sent.push(m);
                    }
                }
                Op::Resolve(id, r) => {
                    let response = match r {
                        0 => PermissionResponse::AllowOnce,
                        1 => PermissionResponse::AllowAlways,
                        _ => PermissionResponse::Deny,
                    };
                    sent.extend(registry.resolve(&id.to_string(), response));
                }
                Op::EnableAuto(id) => sent.extend(registry.enable_auto_approve(&id.to_string())),
            }
        }

        for id in 0u8..5 {
            let id = id.to_string();
            let count = sent
                .iter()
                .filter(|m| matches!(m, Outbound::PermissionResponse { id: got, .. } if *got == id))
                .count();
            prop_assert!(count <= 1, "id {} answered {} times", id, count);
        }
    }
}
