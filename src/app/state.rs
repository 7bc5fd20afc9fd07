//! Application state bundle.
//!
//! Everything the reducer mutates lives here. Nothing in this struct is
//! shared; the runtime owns it and hands `&mut` to [`super::update::update`].

use std::time::Instant;

use serde_json::{Map, Value};

use crate::automode::{AutoMode, AutoModePhase};
use crate::notices::{NoticeBoard, NoticeId};
use crate::permissions::PermissionRegistry;
use crate::restore::RestoreCoordinator;
use crate::session::Session;
use crate::transcript::Transcript;
use crate::types::Config;
use crate::usage::UsageMonitor;
use crate::util::{format_elapsed, format_tokens};

pub struct AppState {
    pub config: Config,
    pub session: Session,
    pub automode: AutoMode,
    pub permissions: PermissionRegistry,
    pub usage: UsageMonitor,
    pub transcript: Transcript,
    pub restore: RestoreCoordinator,
    pub notices: NoticeBoard,

    /// Host settings from the last `settingsData`.
    pub settings: Option<Map<String, Value>>,
    /// Ask the host to plan instead of act on plain sends.
    pub plan_mode: bool,
    /// Ask the host for extended thinking.
    pub thinking_mode: bool,

    /// Notice showing the compaction in progress.
    pub(crate) compaction_notice: Option<NoticeId>,
    /// We sent `newSession` and expect the host to echo `sessionCleared`.
    pub(crate) awaiting_clear: bool,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let usage = UsageMonitor::new(config.warning_percent, config.critical_percent);
        let thinking_mode = config.thinking_mode;
        Self {
            config,
            session: Session::new(),
            automode: AutoMode::new(),
            permissions: PermissionRegistry::new(),
            usage,
            transcript: Transcript::new(),
            restore: RestoreCoordinator::new(),
            notices: NoticeBoard::new(),
            settings: None,
            plan_mode: false,
            thinking_mode,
            compaction_notice: None,
            awaiting_clear: false,
        }
    }

    /// Whether the UI is busy.
    ///
    /// Derived on every call: a request is in flight, or an AutoMode cycle is
    /// running (which spans two requests).
    pub fn busy(&self) -> bool {
        self.session.is_processing() || self.automode.is_active()
    }

    /// Checks whether a new request may be sent.
    ///
    /// Returns the reason to show the user when it may not.
    pub fn send_gate(&self) -> Result<(), String> {
        if let Some(reason) = self.session.blocked() {
            return Err(format!("Blocked: {}", reason));
        }
        if self.busy() {
            return Err("Wait for the current request to finish".to_string());
        }
        if self.restore.is_pending() {
            return Err("An edit is being restored".to_string());
        }
        Ok(())
    }

    /// Status line, e.g. `Processing · 3.2s · 1,234 tokens`.
    pub fn status_line(&self, now: Instant) -> String {
        let tokens = format_tokens(self.usage.usage().total_tokens());
        if self.session.is_processing() {
            let label = match self.automode.phase() {
                AutoModePhase::Planning => "Planning",
                AutoModePhase::Executing => "Executing",
                AutoModePhase::Idle => "Processing",
            };
            return format!(
                "{} · {} · {} tokens",
                label,
                format_elapsed(self.session.elapsed(now)),
                tokens
            );
        }
        if let Some(reason) = self.session.blocked() {
            return format!("Blocked · {}", reason);
        }
        format!("Ready · {}", self.usage.usage().summary())
    }
}
