//! Edit-and-restore coordinator.
//!
//! Editing a past turn rolls the host back to the state before that turn and
//! resubmits the edited text. The host does the rollback; this module keeps
//! the client-side bookkeeping straight.
//!
//! ```text
//! begin_edit(i) ──▶ EditDraft ──confirm(text)──▶ EditRestoreOp(Pending)
//!                                                    │
//!                          editRestoreComplete{messageIndex: i}
//!                          ┌─────────────────────────┴──────────────────┐
//!                      success                                       failure
//!                          │                                            │
//!            op Succeeded, purge turns >= i,              op Failed, draft reopened
//!            resubmit edited text once                    with the original text
//! ```
//!
//! Cancelling an op in flight keeps it around so the host's answer can still
//! be matched: a success still purges (the host already rolled back) but does
//! not resubmit, and a failure is only logged.

use tracing::{debug, warn};

use crate::channel::protocol::RestoreReport;
use crate::channel::Outbound;
use crate::error::{TetherError, TetherResult};

/// An editable copy of a past turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub index: usize,
    pub original_text: String,
}

/// Progress of an edit-and-restore round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStatus {
    Pending,
    Succeeded,
    Failed,
}

/// A confirmed edit waiting for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRestoreOp {
    pub target_index: usize,
    pub edited_text: String,
    pub original_text: String,
    pub status: RestoreStatus,
    pub cancelled: bool,
}

/// What the orchestrator must do with a host restore report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreResolution {
    /// No matching op in flight.
    Ignored,
    /// Purge from `op.target_index`, then resubmit `op.edited_text`.
    Resubmit { op: EditRestoreOp, files_restored: u64 },
    /// Purge from `op.target_index` only; the user cancelled.
    PurgeOnly { op: EditRestoreOp, files_restored: u64 },
    /// Rollback failed; the draft was reopened.
    Failed { draft: EditDraft, message: String },
    /// Rollback failed after the user cancelled.
    CancelledFailure,
}

#[derive(Debug, Clone, Default)]
pub struct RestoreCoordinator {
    draft: Option<EditDraft>,
    op: Option<EditRestoreOp>,
}

impl RestoreCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn draft(&self) -> Option<&EditDraft> {
        self.draft.as_ref()
    }

    #[must_use]
    pub fn op(&self) -> Option<&EditRestoreOp> {
        self.op.as_ref()
    }

    /// Returns `true` while an op waits for the host.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.op.is_some()
    }

    /// Opens a draft of turn `index`.
    ///
    /// # Errors
    ///
    /// Fails while another edit is waiting for the host.
    pub fn begin_edit(&mut self, index: usize, original_text: &str) -> TetherResult<&EditDraft> {
        if self.is_pending() {
            return Err(TetherError::state_race("an edit is already being restored"));
        }
        debug!(index, "Edit draft opened");
        Ok(self.draft.insert(EditDraft {
            index,
            original_text: original_text.to_string(),
        }))
    }

    /// Confirms the open draft with the edited text.
    ///
    /// Returns the `editAndRestorePrompt` to send, or `None` if there is no
    /// draft or an op is already in flight.
    pub fn confirm(&mut self, edited_text: &str) -> Option<Outbound> {
        if self.is_pending() {
            return None;
        }
        let draft = self.draft.take()?;
        debug!(index = draft.index, "Edit confirmed, restoring");

        let message = Outbound::EditAndRestorePrompt {
            message_index: draft.index,
            edited_content: edited_text.to_string(),
            original_content: draft.original_text.clone(),
        };
        self.op = Some(EditRestoreOp {
            target_index: draft.index,
            edited_text: edited_text.to_string(),
            original_text: draft.original_text,
            status: RestoreStatus::Pending,
            cancelled: false,
        });
        Some(message)
    }

    /// Cancels the open draft and any op in flight.
    ///
    /// Returns `true` if there was something to cancel.
    pub fn cancel(&mut self) -> bool {
        let had_draft = self.draft.take().is_some();
        let had_op = match self.op.as_mut() {
            Some(op) if !op.cancelled => {
                op.cancelled = true;
                true
            }
            _ => false,
        };
        had_draft || had_op
    }

    /// Applies the host's restore report.
    pub fn complete(&mut self, report: RestoreReport) -> RestoreResolution {
        let matches = self
            .op
            .as_ref()
            .is_some_and(|op| op.target_index == report.message_index);
        if !matches {
            debug!(
                index = report.message_index,
                "Ignoring restore report with no matching edit"
            );
            return RestoreResolution::Ignored;
        }
        let Some(mut op) = self.op.take() else {
            return RestoreResolution::Ignored;
        };

        if report.success {
            op.status = RestoreStatus::Succeeded;
            let files_restored = report.files_restored;
            if op.cancelled {
                debug!(
                    index = op.target_index,
                    "Restore succeeded after cancel, purging only"
                );
                RestoreResolution::PurgeOnly { op, files_restored }
            } else {
                debug!(index = op.target_index, files_restored, "Restore succeeded");
                RestoreResolution::Resubmit { op, files_restored }
            }
        } else {
            op.status = RestoreStatus::Failed;
            let message = report.error.unwrap_or_else(|| "restore failed".to_string());
            if op.cancelled {
                warn!(index = op.target_index, "Restore failed after cancel: {message}");
                return RestoreResolution::CancelledFailure;
            }
            let draft = self
                .draft
                .insert(EditDraft {
                    index: op.target_index,
                    original_text: op.original_text,
                })
                .clone();
            RestoreResolution::Failed { draft, message }
        }
    }

    /// Drops the draft and any op in flight.
    pub fn clear(&mut self) {
        self.draft = None;
        self.op = None;
    }
}
