//! The reducer.
//!
//! `update` is the only place state changes. Each call handles one event to
//! completion and returns the effects the runtime must carry out, in order.
//! Because a whole event is reduced before the next one is read, the
//! AutoMode hand-off (planning done, execution sent) is atomic from the
//! point of view of anything observing `busy`.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::effect::Effect;
use super::event::{AppEvent, UserAction};
use super::state::AppState;
use super::view::ViewEvent;
use crate::automode::{AutoModePhase, AutoModeStep};
use crate::channel::protocol::{CompactionReport, ContextFigures, RestoreReport};
use crate::channel::{Inbound, Outbound, SettingsPatch};
use crate::error::{BlockingReason, TetherError};
use crate::notices::{NoticeId, NoticeKind};
use crate::permissions::{PermissionResponse, Registration};
use crate::restore::RestoreResolution;
use crate::session::{HostSignal, Session};
use crate::usage::CompactionOrigin;

/// Reduces one event.
pub fn update(state: &mut AppState, event: AppEvent, now: Instant) -> Vec<Effect> {
    let was_busy = state.busy();
    let was_processing = state.session.is_processing();
    let mut fx = Vec::new();

    match event {
        AppEvent::Host(message) => handle_inbound(state, message, now, &mut fx),
        AppEvent::User(action) => handle_action(state, action, now, &mut fx),
        AppEvent::Tick => {
            if state.session.is_processing() {
                fx.push(Effect::View(ViewEvent::Status {
                    line: state.status_line(now),
                }));
            }
        }
        AppEvent::NoticeExpired(id) => handle_notice_expired(state, id, &mut fx),
    }

    let processing = state.session.is_processing();
    if processing && !was_processing {
        fx.push(Effect::StartStatusTicker {
            period: state.config.status_tick,
        });
    } else if !processing && was_processing {
        fx.push(Effect::StopStatusTicker);
    }

    let busy = state.busy();
    if busy != was_busy {
        fx.push(Effect::View(ViewEvent::BusyChanged { busy }));
        fx.push(Effect::View(ViewEvent::Status {
            line: state.status_line(now),
        }));
    }

    fx
}

// ============================================================================
// Host messages
// ============================================================================

fn handle_inbound(state: &mut AppState, message: Inbound, now: Instant, fx: &mut Vec<Effect>) {
    match message {
        Inbound::SetProcessing {
            is_processing,
            request_start_time,
        } => handle_set_processing(state, is_processing, request_start_time, now, fx),

        Inbound::Output { text } => {
            state.automode.acknowledge();
            let index = state.transcript.append_output(&text);
            fx.push(Effect::View(ViewEvent::Output { index, text }));
        }

        Inbound::Error { message } => handle_host_error(state, message, fx),

        Inbound::PermissionRequest { id, tool, pattern } => {
            match state.permissions.register(&id, &tool, pattern.as_deref()) {
                Registration::Prompt => {
                    let description = state
                        .permissions
                        .get(&id)
                        .map(|request| request.description())
                        .unwrap_or_default();
                    fx.push(Effect::View(ViewEvent::PermissionPrompt { id, description }));
                }
                Registration::AutoApproved(response) => {
                    fx.push(Effect::Send(response));
                    fx.push(Effect::View(ViewEvent::PermissionResolved { id, approved: true }));
                }
                Registration::Duplicate => {}
            }
        }

        Inbound::EditRestoreComplete(report) => handle_restore_complete(state, report, now, fx),

        Inbound::ContextStats(figures) => handle_context_stats(state, figures, fx),

        Inbound::ContextCompacted(report) => handle_compacted(state, &report, fx),

        Inbound::UpdateTotals(totals) => {
            state.usage.apply_totals(totals);
            fx.push(Effect::View(ViewEvent::UsageUpdated {
                summary: state.usage.usage().summary(),
            }));
        }

        Inbound::SettingsData { settings } => {
            if let Some(enabled) = settings.get("autoApprovePermissions").and_then(|v| v.as_bool())
            {
                state.permissions.set_auto_approve(enabled);
            }
            if let Some(enabled) = settings.get("thinkingMode").and_then(|v| v.as_bool()) {
                state.thinking_mode = enabled;
            }
            state.settings = Some(settings.clone());
            fx.push(Effect::View(ViewEvent::SettingsLoaded { settings }));
        }

        Inbound::InstallRequired => block(state, BlockingReason::InstallRequired, fx),

        Inbound::LoginRequired { message } => {
            block(state, BlockingReason::LoginRequired { message }, fx);
        }

        Inbound::Ready => {
            if state.session.unblock() {
                info!("Host ready, session unblocked");
                fx.push(Effect::View(ViewEvent::Unblocked));
            }
        }

        Inbound::SessionCleared => {
            if state.awaiting_clear {
                state.awaiting_clear = false;
                debug!("Host confirmed new session");
            } else {
                info!("Host cleared the session");
                reset_session(state, fx);
            }
        }
    }
}

fn handle_set_processing(
    state: &mut AppState,
    is_processing: bool,
    request_start_time: Option<u64>,
    now: Instant,
    fx: &mut Vec<Effect>,
) {
    match state
        .session
        .apply_host_signal(is_processing, request_start_time, now)
    {
        HostSignal::Acknowledged => state.automode.acknowledge(),
        HostSignal::Adopted => {
            info!("Host started processing on its own, adopting");
            state.automode.acknowledge();
        }
        HostSignal::IgnoredAfterStop => {
            debug!("Ignoring processing signal for a stopped request");
        }
        HostSignal::StopConfirmed => debug!("Host confirmed stop"),
        HostSignal::AlreadyIdle => debug!("Host idle, nothing in flight"),
        HostSignal::Completed => handle_completion(state, now, fx),
    }
}

fn handle_completion(state: &mut AppState, now: Instant, fx: &mut Vec<Effect>) {
    let directive = state.config.execute_directive.clone();
    match state.automode.on_complete(&directive) {
        AutoModeStep::Inactive => {
            state.session.finish();
        }
        AutoModeStep::Execute { text } => {
            // Restart the request clock without ever leaving busy.
            state.session.finish();
            dispatch_request(state, text.clone(), text, false, now, fx);
            fx.push(Effect::View(ViewEvent::AutoModeChanged {
                phase: AutoModePhase::Executing,
            }));
        }
        AutoModeStep::StaleCompletion => {
            let race = TetherError::state_race("completion before execution was acknowledged");
            debug!("{race}");
        }
        AutoModeStep::Finished => {
            state.session.finish();
            fx.push(Effect::View(ViewEvent::AutoModeChanged {
                phase: AutoModePhase::Idle,
            }));
            show_notice(state, NoticeKind::Success, "AutoMode finished", fx);
        }
    }
}

fn handle_host_error(state: &mut AppState, message: String, fx: &mut Vec<Effect>) {
    let error = TetherError::host_operation(message.clone());
    warn!("{error}");

    let index = state.transcript.record_error(&message);
    fx.push(Effect::View(ViewEvent::TurnFailed { index, message }));

    state.session.finish();
    if state.automode.reset() {
        fx.push(Effect::View(ViewEvent::AutoModeChanged {
            phase: AutoModePhase::Idle,
        }));
    }
    if error.should_surface() {
        show_notice(state, NoticeKind::Error, error.to_string(), fx);
    }
}

fn block(state: &mut AppState, reason: BlockingReason, fx: &mut Vec<Effect>) {
    let error = TetherError::blocking(reason.clone());
    warn!("{error}");

    state.session.block(reason.clone());
    if state.automode.reset() {
        fx.push(Effect::View(ViewEvent::AutoModeChanged {
            phase: AutoModePhase::Idle,
        }));
    }
    fx.push(Effect::View(ViewEvent::Blocked {
        reason: reason.to_string(),
    }));
}

fn handle_restore_complete(
    state: &mut AppState,
    report: RestoreReport,
    now: Instant,
    fx: &mut Vec<Effect>,
) {
    match state.restore.complete(report) {
        RestoreResolution::Ignored => {}
        RestoreResolution::Resubmit { op, files_restored } => {
            purge(state, op.target_index, fx);
            show_notice(
                state,
                NoticeKind::Success,
                format!("Restored {} file(s)", files_restored),
                fx,
            );
            // The edit already passed the send gate when it was confirmed.
            let plan_mode = state.plan_mode;
            dispatch_request(state, op.edited_text.clone(), op.edited_text, plan_mode, now, fx);
        }
        RestoreResolution::PurgeOnly { op, files_restored } => {
            purge(state, op.target_index, fx);
            show_notice(
                state,
                NoticeKind::Info,
                format!("Edit cancelled, restored {} file(s)", files_restored),
                fx,
            );
        }
        RestoreResolution::Failed { draft, message } => {
            let error = TetherError::restore_failure(draft.index, message);
            warn!("{error}");
            fx.push(Effect::View(ViewEvent::DraftOpened {
                index: draft.index,
                text: draft.original_text,
            }));
            show_notice(state, NoticeKind::Error, error.to_string(), fx);
        }
        RestoreResolution::CancelledFailure => {}
    }
}

fn purge(state: &mut AppState, from: usize, fx: &mut Vec<Effect>) {
    let count = state.transcript.purge_from(from);
    fx.push(Effect::View(ViewEvent::TranscriptPurged { from, count }));
}

fn handle_context_stats(state: &mut AppState, figures: ContextFigures, fx: &mut Vec<Effect>) {
    if let Some(CompactionOrigin::Auto) = state.usage.apply_context(figures) {
        let text = format!(
            "Context at {:.0}%, auto-compacting…",
            state.usage.context().usage_percent
        );
        let timeout = state.config.compaction_notice_timeout;
        replace_compaction_notice(state, NoticeKind::Compacting, text, Some(timeout), fx);
    }
    push_context(state, fx);
}

fn handle_compacted(state: &mut AppState, report: &CompactionReport, fx: &mut Vec<Effect>) {
    let text = state.usage.apply_compacted(report);
    let kind = if report.success {
        NoticeKind::Success
    } else {
        NoticeKind::Error
    };
    let ttl = state.config.notice_ttl;
    replace_compaction_notice(state, kind, text, Some(ttl), fx);
    // The result notice is not a compaction in progress.
    state.compaction_notice = None;
    push_context(state, fx);
}

fn push_context(state: &AppState, fx: &mut Vec<Effect>) {
    let context = state.usage.context();
    fx.push(Effect::View(ViewEvent::ContextUpdated {
        percent: context.usage_percent,
        band: context.band(),
    }));
}

// ============================================================================
// User actions
// ============================================================================

fn handle_action(state: &mut AppState, action: UserAction, now: Instant, fx: &mut Vec<Effect>) {
    match action {
        UserAction::Send { text } => {
            let plan_mode = state.plan_mode;
            submit(state, text.clone(), text, plan_mode, now, fx);
        }

        UserAction::StartAutoMode { text } => {
            if text.trim().is_empty() {
                return;
            }
            if let Err(reason) = state.send_gate() {
                show_notice(state, NoticeKind::Warning, reason, fx);
                return;
            }
            let directive = state.config.plan_directive.clone();
            let wire = state.automode.start(&text, &directive);
            dispatch_request(state, text, wire, true, now, fx);
            fx.push(Effect::View(ViewEvent::AutoModeChanged {
                phase: AutoModePhase::Planning,
            }));
        }

        UserAction::Stop => {
            if !state.busy() {
                debug!("Stop with nothing in flight");
                return;
            }
            state.session.stop();
            if state.automode.reset() {
                fx.push(Effect::View(ViewEvent::AutoModeChanged {
                    phase: AutoModePhase::Idle,
                }));
            }
            fx.push(Effect::Send(Outbound::StopRequest {}));
            show_notice(state, NoticeKind::Info, "Stopped", fx);
        }

        UserAction::ResolvePermission { id, response } => {
            match state.permissions.resolve(&id, response) {
                Some(message) => {
                    fx.push(Effect::Send(message));
                    fx.push(Effect::View(ViewEvent::PermissionResolved {
                        approved: response != PermissionResponse::Deny,
                        id,
                    }));
                }
                None => debug!(id = %id, "Permission unknown or already resolved"),
            }
        }

        UserAction::EnableAutoApprove { id } => {
            let messages = state.permissions.enable_auto_approve(&id);
            if messages.is_empty() {
                debug!(id = %id, "Permission unknown or already resolved");
                return;
            }
            fx.extend(messages.into_iter().map(Effect::Send));
            fx.push(Effect::View(ViewEvent::PermissionResolved { id, approved: true }));
            show_notice(state, NoticeKind::Info, "Auto-approve enabled", fx);
        }

        UserAction::BeginEdit { index } => {
            if state.busy() {
                show_notice(state, NoticeKind::Warning, "Cannot edit while busy", fx);
                return;
            }
            let Some(prompt) = state.transcript.get(index).map(|turn| turn.prompt.clone()) else {
                show_notice(state, NoticeKind::Warning, format!("No turn #{}", index), fx);
                return;
            };
            match state.restore.begin_edit(index, &prompt) {
                Ok(draft) => fx.push(Effect::View(ViewEvent::DraftOpened {
                    index: draft.index,
                    text: draft.original_text.clone(),
                })),
                Err(e) => {
                    debug!("{e}");
                    show_notice(state, NoticeKind::Warning, "An edit is being restored", fx);
                }
            }
        }

        UserAction::ConfirmEdit { text } => {
            if let Err(reason) = state.send_gate() {
                show_notice(state, NoticeKind::Warning, reason, fx);
                return;
            }
            match state.restore.confirm(&text) {
                Some(message) => fx.push(Effect::Send(message)),
                None => {
                    show_notice(state, NoticeKind::Warning, "No edit is open", fx);
                }
            }
        }

        UserAction::CancelEdit => {
            if state.restore.cancel() {
                show_notice(state, NoticeKind::Info, "Edit cancelled", fx);
            }
        }

        UserAction::CompactContext => {
            if let Some(reason) = state.session.blocked() {
                let text = format!("Blocked: {}", reason);
                show_notice(state, NoticeKind::Warning, text, fx);
                return;
            }
            if !state.usage.begin_manual() {
                show_notice(state, NoticeKind::Warning, "Compaction already in progress", fx);
                return;
            }
            let timeout = state.config.compaction_notice_timeout;
            replace_compaction_notice(
                state,
                NoticeKind::Compacting,
                "Compacting context…".to_string(),
                Some(timeout),
                fx,
            );
            fx.push(Effect::Send(Outbound::CompactContext { manual: true }));
        }

        UserAction::NewSession => {
            reset_session(state, fx);
            state.awaiting_clear = true;
            fx.push(Effect::Send(Outbound::NewSession {}));
        }

        UserAction::RequestSettings => fx.push(Effect::Send(Outbound::GetSettings {})),

        UserAction::UpdateSettings(patch) => update_settings(state, patch, fx),

        UserAction::TogglePlanMode => {
            state.plan_mode = !state.plan_mode;
            let text = format!("Plan mode {}", on_off(state.plan_mode));
            show_notice(state, NoticeKind::Info, text, fx);
        }

        UserAction::ToggleThinkingMode => {
            state.thinking_mode = !state.thinking_mode;
            let text = format!("Thinking mode {}", on_off(state.thinking_mode));
            show_notice(state, NoticeKind::Info, text, fx);
        }

        UserAction::DismissNotice(id) => {
            if state.notices.dismiss(id) {
                fx.push(Effect::CancelDismiss { id });
                fx.push(Effect::View(ViewEvent::NoticeDismissed { id }));
            }
        }
    }
}

fn update_settings(state: &mut AppState, patch: SettingsPatch, fx: &mut Vec<Effect>) {
    if patch.is_empty() {
        return;
    }
    if let Some(enabled) = patch.auto_approve_permissions {
        state.permissions.set_auto_approve(enabled);
    }
    if let Some(enabled) = patch.thinking_mode {
        state.thinking_mode = enabled;
    }
    fx.push(Effect::Send(Outbound::UpdateSettings { settings: patch }));
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

// ============================================================================
// Shared paths
// ============================================================================

/// Normal send path: checks the gate, then dispatches.
fn submit(
    state: &mut AppState,
    prompt: String,
    wire: String,
    plan_mode: bool,
    now: Instant,
    fx: &mut Vec<Effect>,
) {
    if prompt.trim().is_empty() {
        return;
    }
    if let Err(reason) = state.send_gate() {
        show_notice(state, NoticeKind::Warning, reason, fx);
        return;
    }
    dispatch_request(state, prompt, wire, plan_mode, now, fx);
}

/// Starts a request. `prompt` is recorded in the transcript, `wire` is sent.
fn dispatch_request(
    state: &mut AppState,
    prompt: String,
    wire: String,
    plan_mode: bool,
    now: Instant,
    fx: &mut Vec<Effect>,
) {
    state.session.begin(now);
    let index = state.transcript.push_turn(prompt.clone());
    debug!(index, plan_mode, "Request sent");
    fx.push(Effect::View(ViewEvent::TurnStarted { index, prompt }));
    fx.push(Effect::Send(Outbound::SendMessage {
        text: wire,
        plan_mode,
        thinking_mode: state.thinking_mode,
    }));
}

fn reset_session(state: &mut AppState, fx: &mut Vec<Effect>) {
    let blocked = state.session.blocked().cloned();
    state.session = Session::new();
    if let Some(reason) = blocked {
        // Install/login problems outlive the conversation.
        state.session.block(reason);
    }
    state.automode.reset();
    state.permissions.clear();
    state.transcript.clear();
    state.restore.clear();
    state.usage.reset_context();
    state.notices.clear();
    state.compaction_notice = None;
    fx.push(Effect::CancelAllDismissals);
    fx.push(Effect::View(ViewEvent::SessionReset {
        id: state.session.id(),
    }));
}

// ============================================================================
// Notices
// ============================================================================

fn show_notice(
    state: &mut AppState,
    kind: NoticeKind,
    text: impl Into<String>,
    fx: &mut Vec<Effect>,
) -> NoticeId {
    let ttl = match kind {
        NoticeKind::Error => None,
        _ => Some(state.config.notice_ttl),
    };
    push_notice(state, kind, text.into(), ttl, fx)
}

fn push_notice(
    state: &mut AppState,
    kind: NoticeKind,
    text: String,
    ttl: Option<Duration>,
    fx: &mut Vec<Effect>,
) -> NoticeId {
    let id = state.notices.push(kind, text.clone(), ttl);
    fx.push(Effect::View(ViewEvent::NoticeShown { id, kind, text }));
    if let Some(after) = ttl {
        fx.push(Effect::ScheduleDismiss { id, after });
    }
    id
}

/// Dismisses the compaction notice (if any) and shows a new one in its place.
///
/// The replacement gets a fresh id so the old timer cannot dismiss it.
fn replace_compaction_notice(
    state: &mut AppState,
    kind: NoticeKind,
    text: String,
    ttl: Option<Duration>,
    fx: &mut Vec<Effect>,
) {
    if let Some(old) = state.compaction_notice.take() {
        if state.notices.dismiss(old) {
            fx.push(Effect::CancelDismiss { id: old });
            fx.push(Effect::View(ViewEvent::NoticeDismissed { id: old }));
        }
    }
    let id = push_notice(state, kind, text, ttl, fx);
    state.compaction_notice = Some(id);
}

fn handle_notice_expired(state: &mut AppState, id: NoticeId, fx: &mut Vec<Effect>) {
    if !state.notices.dismiss(id) {
        return;
    }
    fx.push(Effect::View(ViewEvent::NoticeDismissed { id }));
    if state.compaction_notice == Some(id) {
        state.compaction_notice = None;
        if let Some(origin) = state.usage.expire_compaction() {
            debug!(origin = ?origin, "Stopped waiting for compaction result");
        }
    }
}
