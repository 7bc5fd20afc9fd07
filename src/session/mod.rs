//! Session/request state machine.
//!
//! ```text
//! ┌──────┐  begin()                  ┌────────────┐
//! │ Idle │ ────────────────────────▶ │ Processing │
//! └──────┘ ◀──────────────────────── └────────────┘
//!           finish() | stop() | host error
//! ```
//!
//! The session only tracks its own status. Whether the UI is *busy* also
//! depends on AutoMode and is derived by [`crate::app::state::AppState::busy`].
//!
//! Stopping is optimistic: the session goes Idle at once and remembers that a
//! host confirmation is outstanding. Until the host reports it has stopped, a
//! late "processing started" signal from the cancelled request is ignored.

use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

use crate::error::BlockingReason;

/// Request lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// Ready for a new request.
    #[default]
    Idle,
    /// A request is in flight.
    Processing,
}

/// How the session interpreted a host `setProcessing` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    /// Host confirmed the request the client already started.
    Acknowledged,
    /// Host started processing while the client was idle; adopted.
    Adopted,
    /// Host reported processing for a request the user already stopped.
    IgnoredAfterStop,
    /// Host finished the request in flight.
    Completed,
    /// Host confirmed a stop the client already applied.
    StopConfirmed,
    /// Host reported idle while the client was already idle.
    AlreadyIdle,
}

/// One conversation with the host.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    status: SessionStatus,
    started_at: Option<Instant>,
    host_started_at_ms: Option<u64>,
    stop_pending: bool,
    blocked: Option<BlockingReason>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an idle session with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: SessionStatus::Idle,
            started_at: None,
            host_started_at_ms: None,
            stop_pending: false,
            blocked: None,
        }
    }

    /// Returns the session id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns `true` while a request is in flight.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.status == SessionStatus::Processing
    }

    /// Returns `true` while a stop is waiting for host confirmation.
    #[must_use]
    pub fn stop_pending(&self) -> bool {
        self.stop_pending
    }

    /// Returns the host-side start time of the current request, if reported.
    #[must_use]
    pub fn host_started_at_ms(&self) -> Option<u64> {
        self.host_started_at_ms
    }

    /// Returns how long the current request has been running.
    #[must_use]
    pub fn elapsed(&self, now: Instant) -> Duration {
        self.started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default()
    }

    /// Starts a request: `Idle -> Processing`.
    ///
    /// Returns `false` (and changes nothing) if a request is already in flight.
    pub fn begin(&mut self, now: Instant) -> bool {
        if self.is_processing() {
            return false;
        }
        self.status = SessionStatus::Processing;
        self.started_at = Some(now);
        self.host_started_at_ms = None;
        debug!(session = %self.id, "Session processing");
        true
    }

    /// Finishes the request in flight: `Processing -> Idle`.
    ///
    /// Returns `true` if the session was processing.
    pub fn finish(&mut self) -> bool {
        if !self.is_processing() {
            return false;
        }
        self.status = SessionStatus::Idle;
        self.started_at = None;
        self.host_started_at_ms = None;
        debug!(session = %self.id, "Session idle");
        true
    }

    /// Stops the request in flight without waiting for the host.
    ///
    /// Returns `true` if a request was in flight. The host confirmation is then
    /// expected as a `setProcessing{isProcessing:false}` signal.
    pub fn stop(&mut self) -> bool {
        let was_processing = self.finish();
        if was_processing {
            self.stop_pending = true;
        }
        was_processing
    }

    /// Applies a host `setProcessing` signal.
    pub fn apply_host_signal(
        &mut self,
        is_processing: bool,
        request_start_time: Option<u64>,
        now: Instant,
    ) -> HostSignal {
        match (is_processing, self.status) {
            (true, SessionStatus::Processing) => {
                self.host_started_at_ms = request_start_time.or(self.host_started_at_ms);
                HostSignal::Acknowledged
            }
            (true, SessionStatus::Idle) if self.stop_pending => HostSignal::IgnoredAfterStop,
            (true, SessionStatus::Idle) => {
                self.begin(now);
                self.host_started_at_ms = request_start_time;
                HostSignal::Adopted
            }
            (false, _) if self.stop_pending => {
                self.stop_pending = false;
                HostSignal::StopConfirmed
            }
            (false, SessionStatus::Processing) => HostSignal::Completed,
            (false, SessionStatus::Idle) => HostSignal::AlreadyIdle,
        }
    }

    /// Puts the session into a blocked state until the host reports ready.
    ///
    /// Any request in flight is abandoned.
    pub fn block(&mut self, reason: BlockingReason) {
        self.finish();
        self.stop_pending = false;
        self.blocked = Some(reason);
    }

    /// Clears a blocked state. Returns `true` if the session was blocked.
    pub fn unblock(&mut self) -> bool {
        self.blocked.take().is_some()
    }

    /// Returns why the session is blocked, if it is.
    #[must_use]
    pub fn blocked(&self) -> Option<&BlockingReason> {
        self.blocked.as_ref()
    }
}
