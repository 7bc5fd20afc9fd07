//! Presentation port.
//!
//! The core never renders. It publishes [`ViewEvent`]s on a broadcast channel
//! and whatever is attached (the console binary, a test, an editor panel)
//! decides how to show them. `Display` gives a plain one-line rendering.

use std::fmt;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::automode::AutoModePhase;
use crate::notices::{NoticeId, NoticeKind};
use crate::usage::ContextBand;
use crate::util::truncate_string;

/// Settings wider than this are cut when rendered on one line.
const SETTINGS_DISPLAY_WIDTH: usize = 120;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    BusyChanged {
        busy: bool,
    },
    Status {
        line: String,
    },
    TurnStarted {
        index: usize,
        prompt: String,
    },
    Output {
        index: usize,
        text: String,
    },
    TurnFailed {
        index: Option<usize>,
        message: String,
    },
    /// Turns from `from` on were removed.
    TranscriptPurged {
        from: usize,
        count: usize,
    },
    PermissionPrompt {
        id: String,
        description: String,
    },
    PermissionResolved {
        id: String,
        approved: bool,
    },
    NoticeShown {
        id: NoticeId,
        kind: NoticeKind,
        text: String,
    },
    NoticeDismissed {
        id: NoticeId,
    },
    /// An editable draft of turn `index` is open.
    DraftOpened {
        index: usize,
        text: String,
    },
    AutoModeChanged {
        phase: AutoModePhase,
    },
    ContextUpdated {
        percent: f64,
        band: ContextBand,
    },
    UsageUpdated {
        summary: String,
    },
    Blocked {
        reason: String,
    },
    Unblocked,
    SettingsLoaded {
        settings: Map<String, Value>,
    },
    SessionReset {
        id: Uuid,
    },
}

impl fmt::Display for ViewEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusyChanged { busy: true } => write!(f, "[busy]"),
            Self::BusyChanged { busy: false } => write!(f, "[idle]"),
            Self::Status { line } => write!(f, "[status] {}", line),
            Self::TurnStarted { index, prompt } => write!(f, "#{} > {}", index, prompt),
            Self::Output { text, .. } => write!(f, "{}", text),
            Self::TurnFailed {
                index: Some(index),
                message,
            } => write!(f, "#{} failed: {}", index, message),
            Self::TurnFailed {
                index: None,
                message,
            } => write!(f, "failed: {}", message),
            Self::TranscriptPurged { from, count } => {
                write!(f, "[transcript] removed {} turn(s) from #{}", count, from)
            }
            Self::PermissionPrompt { id, description } => {
                write!(f, "[permission {}] {} (/allow, /always, /deny, /yolo)", id, description)
            }
            Self::PermissionResolved { id, approved } => {
                let verdict = if *approved { "approved" } else { "denied" };
                write!(f, "[permission {}] {}", id, verdict)
            }
            Self::NoticeShown { kind, text, .. } => write!(f, "[{}] {}", kind, text),
            Self::NoticeDismissed { id } => write!(f, "[notice {} dismissed]", id),
            Self::DraftOpened { index, text } => write!(f, "[edit #{}] {}", index, text),
            Self::AutoModeChanged { phase } => write!(f, "[auto] {:?}", phase),
            Self::ContextUpdated { percent, band } => {
                write!(f, "[context] {:.1}% ({})", percent, band)
            }
            Self::UsageUpdated { summary } => write!(f, "[usage] {}", summary),
            Self::Blocked { reason } => write!(f, "[blocked] {}", reason),
            Self::Unblocked => write!(f, "[ready]"),
            Self::SettingsLoaded { settings } => {
                let json = Value::Object(settings.clone()).to_string();
                write!(f, "[settings] {}", truncate_string(&json, SETTINGS_DISPLAY_WIDTH))
            }
            Self::SessionReset { id } => write!(f, "[new session {}]", id),
        }
    }
}
