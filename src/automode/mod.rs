//! AutoMode: two-phase plan-then-execute workflow.
//!
//! ```text
//! ┌──────┐ start()  ┌──────────┐ complete  ┌───────────┐ complete  ┌──────┐
//! │ Idle │ ───────▶ │ Planning │ ────────▶ │ Executing │ ────────▶ │ Idle │
//! └──────┘          └──────────┘           └───────────┘           └──────┘
//!     ▲                   │ stop / error         │ stop / error
//!     └───────────────────┴──────────────────────┘
//! ```
//!
//! When planning completes, the orchestrator sends the execution request in
//! the same reducer step, so the derived busy state never drops in between.
//!
//! A completion signal that reaches us after the hand-off but before the host
//! has acknowledged the execution request belongs to the planning request
//! (delayed delivery) and must not end the cycle.

use tracing::{debug, warn};

/// AutoMode phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AutoModePhase {
    /// Not running.
    #[default]
    Idle,
    /// Waiting for the plan.
    Planning,
    /// Waiting for the autonomous execution of the plan.
    Executing,
}

/// What a completion signal means for AutoMode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoModeStep {
    /// AutoMode is not running; the session handles the completion.
    Inactive,
    /// Planning finished; send this execution request.
    Execute {
        /// Fixed execution directive.
        text: String,
    },
    /// Completion arrived before the execution request was acknowledged.
    StaleCompletion,
    /// Execution finished; the cycle is over.
    Finished,
}

/// AutoMode state for one plan+execute cycle.
#[derive(Debug, Clone, Default)]
pub struct AutoMode {
    phase: AutoModePhase,
    original_message: Option<String>,
    awaiting_ack: bool,
}

impl AutoMode {
    /// Creates an idle AutoMode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> AutoModePhase {
        self.phase
    }

    /// Returns `true` unless the phase is `Idle`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase != AutoModePhase::Idle
    }

    /// Returns the request that started the cycle, verbatim.
    #[must_use]
    pub fn original_message(&self) -> Option<&str> {
        self.original_message.as_deref()
    }

    /// Returns `true` while an early completion of the execution request
    /// would still be ignored.
    #[must_use]
    pub fn awaiting_ack(&self) -> bool {
        self.awaiting_ack
    }

    /// Starts a cycle and returns the planning request text.
    pub fn start(&mut self, text: &str, plan_directive: &str) -> String {
        self.phase = AutoModePhase::Planning;
        self.original_message = Some(text.to_string());
        self.awaiting_ack = false;
        debug!("AutoMode planning");
        format!("{}\n\n{}", plan_directive, text)
    }

    /// Records that the host started working on the latest request.
    pub fn acknowledge(&mut self) {
        if self.awaiting_ack {
            debug!("AutoMode execution acknowledged");
        }
        self.awaiting_ack = false;
    }

    /// Applies a host completion signal.
    pub fn on_complete(&mut self, execute_directive: &str) -> AutoModeStep {
        match self.phase {
            AutoModePhase::Idle => AutoModeStep::Inactive,
            AutoModePhase::Planning => {
                self.phase = AutoModePhase::Executing;
                self.awaiting_ack = true;
                debug!("AutoMode executing");
                AutoModeStep::Execute {
                    text: execute_directive.to_string(),
                }
            }
            AutoModePhase::Executing if self.awaiting_ack => {
                // Only one early completion is swallowed; the next one ends the cycle.
                self.awaiting_ack = false;
                warn!("Completion arrived before execution was acknowledged, ignoring");
                AutoModeStep::StaleCompletion
            }
            AutoModePhase::Executing => {
                self.reset();
                AutoModeStep::Finished
            }
        }
    }

    /// Returns to `Idle` and clears the original message.
    ///
    /// Returns `true` if a cycle was running.
    pub fn reset(&mut self) -> bool {
        let was_active = self.is_active();
        self.phase = AutoModePhase::Idle;
        self.original_message = None;
        self.awaiting_ack = false;
        if was_active {
            debug!("AutoMode idle");
        }
        was_active
    }
}
