//! Host message protocol.
//!
//! Every message crossing the host boundary is an envelope with a `type`
//! field naming the variant and a `data` field carrying its payload:
//!
//! ```text
//! {"type": "sendMessage", "data": {"text": "fix bug", "planMode": false, "thinkingMode": false}}
//! {"type": "setProcessing", "data": {"isProcessing": true, "requestStartTime": 1718000000000}}
//! ```
//!
//! Outbound messages are a serde-tagged enum. Inbound messages are decoded by
//! hand through [`Fields`] so that missing or malformed payload fields fall
//! back to zero values, and unknown types are skipped for forward
//! compatibility.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::fields::Fields;
use crate::error::TetherResult;

/// Messages sent FROM the client TO the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Outbound {
    /// Submit a user (or synthesized) request.
    SendMessage {
        /// Request text.
        text: String,
        /// Ask the host to plan instead of acting.
        plan_mode: bool,
        /// Ask the host for extended thinking.
        thinking_mode: bool,
    },

    /// Cancel the request in flight.
    StopRequest {},

    /// Resolve a permission request.
    PermissionResponse {
        /// Correlation id of the request.
        id: String,
        /// Whether the tool may run.
        approved: bool,
        /// Whether the host should remember the approval for this tool/pattern.
        always_allow: bool,
    },

    /// Roll back everything from `message_index` on and resubmit an edited turn.
    EditAndRestorePrompt {
        /// Index of the turn being edited.
        message_index: usize,
        /// Replacement text.
        edited_content: String,
        /// Text the turn had before the edit.
        original_content: String,
    },

    /// Ask the host to compact the conversation context.
    CompactContext {
        /// `true` when the user asked for it.
        manual: bool,
    },

    /// Request the host's current settings.
    GetSettings {},

    /// Update host settings.
    UpdateSettings {
        /// Fields to change.
        settings: SettingsPatch,
    },

    /// Discard the conversation and start a new session.
    NewSession {},
}

impl Outbound {
    /// Returns the wire `type` name.
    #[must_use]
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::SendMessage { .. } => "sendMessage",
            Self::StopRequest {} => "stopRequest",
            Self::PermissionResponse { .. } => "permissionResponse",
            Self::EditAndRestorePrompt { .. } => "editAndRestorePrompt",
            Self::CompactContext { .. } => "compactContext",
            Self::GetSettings {} => "getSettings",
            Self::UpdateSettings { .. } => "updateSettings",
            Self::NewSession {} => "newSession",
        }
    }
}

/// Partial settings update. Only fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    /// Approve every future permission request without prompting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_approve_permissions: Option<bool>,

    /// Default thinking mode for new requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_mode: Option<bool>,

    /// Model identifier the host should use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl SettingsPatch {
    /// Patch that turns on global auto-approval.
    #[must_use]
    pub fn auto_approve() -> Self {
        Self {
            auto_approve_permissions: Some(true),
            ..Self::default()
        }
    }

    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.auto_approve_permissions.is_none()
            && self.thinking_mode.is_none()
            && self.model.is_none()
    }
}

/// Result of a host-side edit-and-restore.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RestoreReport {
    /// Whether the rollback succeeded.
    pub success: bool,
    /// Turn index the rollback targeted.
    pub message_index: usize,
    /// Edited text echoed back by the host.
    pub edited_content: String,
    /// Number of files the host restored.
    pub files_restored: u64,
    /// Error text on failure.
    pub error: Option<String>,
}

/// Context figures reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextFigures {
    /// Tokens currently in the context window.
    pub total_tokens: u64,
    /// Size of the context window. `0` when unknown.
    pub max_tokens: u64,
}

/// Result of a context compaction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompactionReport {
    /// Whether compaction succeeded.
    pub success: bool,
    /// Fraction of the context removed (0.0 - 1.0).
    pub compression_ratio: f64,
    /// Number of messages folded into the summary.
    pub messages_compressed: u64,
    /// Post-compaction context figures, if the host sent them.
    pub stats: Option<ContextFigures>,
    /// Error text on failure.
    pub error: Option<String>,
}

/// Cumulative usage totals reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    /// Total cost in USD.
    pub total_cost: f64,
    /// Total input tokens.
    pub total_tokens_input: u64,
    /// Total output tokens.
    pub total_tokens_output: u64,
    /// Number of completed requests.
    pub request_count: u64,
}

/// Messages sent FROM the host TO the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// The host started or finished processing.
    SetProcessing {
        /// `true` when a request started, `false` when it finished.
        is_processing: bool,
        /// Host-side start time in epoch milliseconds, if known.
        request_start_time: Option<u64>,
    },
    /// Streamed agent output.
    Output {
        /// Output chunk.
        text: String,
    },
    /// Agent or tool failure.
    Error {
        /// Error text.
        message: String,
    },
    /// The host needs permission to run a tool.
    PermissionRequest {
        /// Correlation id.
        id: String,
        /// Tool name.
        tool: String,
        /// Input pattern the tool would run with.
        pattern: Option<String>,
    },
    /// Result of an edit-and-restore.
    EditRestoreComplete(RestoreReport),
    /// New context window figures.
    ContextStats(ContextFigures),
    /// Context compaction finished.
    ContextCompacted(CompactionReport),
    /// New cumulative usage totals.
    UpdateTotals(Totals),
    /// Host settings, in answer to `getSettings`.
    SettingsData {
        /// Raw settings map.
        settings: Map<String, Value>,
    },
    /// The agent host binary is missing.
    InstallRequired,
    /// The agent host needs the user to log in.
    LoginRequired {
        /// Host-provided hint.
        message: String,
    },
    /// The host is ready to serve requests.
    Ready,
    /// The host discarded the conversation.
    SessionCleared,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Decodes one inbound line.
///
/// Returns `Ok(None)` for unknown message types.
///
/// # Errors
///
/// Returns a protocol error if the line is not a JSON envelope with a
/// string `type` field.
pub fn decode_inbound(line: &str) -> TetherResult<Option<Inbound>> {
    let envelope: Envelope = serde_json::from_str(line)?;
    Ok(decode_envelope(&envelope.kind, &envelope.data))
}

/// Decodes an already-parsed envelope.
#[must_use]
pub fn decode_envelope(kind: &str, data: &Value) -> Option<Inbound> {
    let fields = Fields::new(data);
    let message = match kind {
        "setProcessing" => Inbound::SetProcessing {
            is_processing: fields.bool("isProcessing"),
            request_start_time: Some(fields.u64("requestStartTime")).filter(|t| *t > 0),
        },
        "output" => Inbound::Output {
            text: fields.text(),
        },
        "error" => Inbound::Error {
            message: fields.text(),
        },
        "permissionRequest" => Inbound::PermissionRequest {
            id: fields.string("id"),
            tool: fields.string("tool"),
            pattern: fields.opt_string("pattern"),
        },
        "editRestoreComplete" => Inbound::EditRestoreComplete(RestoreReport {
            success: fields.bool("success"),
            message_index: fields.u64("messageIndex") as usize,
            edited_content: fields.string("editedContent"),
            files_restored: fields.u64("filesRestored"),
            error: fields.opt_string("error"),
        }),
        "contextStats" => Inbound::ContextStats(context_figures(&fields)),
        "contextCompacted" => Inbound::ContextCompacted(CompactionReport {
            success: fields.bool_or("success", true),
            compression_ratio: fields.f64("compressionRatio").clamp(0.0, 1.0),
            messages_compressed: fields.u64("messagesCompressed"),
            stats: fields.object("stats").map(|stats| context_figures(&stats)),
            error: fields.opt_string("error"),
        }),
        "updateTotals" => Inbound::UpdateTotals(Totals {
            total_cost: fields.f64("totalCost").max(0.0),
            total_tokens_input: fields.u64("totalTokensInput"),
            total_tokens_output: fields.u64("totalTokensOutput"),
            request_count: fields.u64("requestCount"),
        }),
        "settingsData" => Inbound::SettingsData {
            settings: fields.to_map(),
        },
        "installRequired" => Inbound::InstallRequired,
        "loginRequired" => Inbound::LoginRequired {
            message: fields.text(),
        },
        "ready" => Inbound::Ready,
        "sessionCleared" => Inbound::SessionCleared,
        _ => return None,
    };
    Some(message)
}

fn context_figures(fields: &Fields<'_>) -> ContextFigures {
    ContextFigures {
        total_tokens: fields.u64("totalTokens"),
        max_tokens: fields.u64("maxTokens"),
    }
}

/// Serializes an outbound message as a single JSON line (without the newline).
///
/// # Errors
///
/// Returns an error if serialization fails (should not happen for valid data).
pub fn encode_outbound(message: &Outbound) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}
