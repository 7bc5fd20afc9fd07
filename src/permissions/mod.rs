//! Permission requests from the host.
//!
//! The host asks before running sensitive tools. Each request carries a
//! correlation id and must be answered exactly once.
//!
//! # Architecture
//!
//! ```text
//! permissionRequest{id}
//!     ↓
//! PermissionRegistry::register()
//!     ├─ auto-approve on → answer immediately
//!     ├─ id already known → ignore
//!     └─ otherwise → Pending, prompt the user
//!
//! PermissionRegistry::resolve(id, response)
//!     ├─ Pending → record decision, emit permissionResponse
//!     └─ decided / unknown → no-op
//! ```
//!
//! # Example
//!
//! ```
//! use tether::permissions::{PermissionRegistry, PermissionResponse, Registration};
//!
//! let mut registry = PermissionRegistry::new();
//! assert!(matches!(
//!     registry.register("p-1", "Bash", Some("git status")),
//!     Registration::Prompt
//! ));
//!
//! assert!(registry.resolve("p-1", PermissionResponse::AllowOnce).is_some());
//! // A second answer for the same id is ignored.
//! assert!(registry.resolve("p-1", PermissionResponse::Deny).is_none());
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::channel::{Outbound, SettingsPatch};

/// Decision recorded for a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionDecision {
    /// Waiting for the user.
    #[default]
    Pending,
    /// The tool may run.
    Approved,
    /// The tool may not run.
    Denied,
}

/// User response to a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionResponse {
    /// Allow this tool execution once.
    AllowOnce,
    /// Allow, and let the host remember the approval for this tool/pattern.
    AllowAlways,
    /// Deny this tool execution.
    Deny,
}

impl PermissionResponse {
    fn decision(self) -> PermissionDecision {
        match self {
            Self::AllowOnce | Self::AllowAlways => PermissionDecision::Approved,
            Self::Deny => PermissionDecision::Denied,
        }
    }
}

/// A permission request received from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequest {
    /// Correlation id.
    pub id: String,
    /// Tool name.
    pub tool: String,
    /// Input pattern the tool would run with.
    pub pattern: Option<String>,
    decision: PermissionDecision,
    always_allow: bool,
}

impl PermissionRequest {
    /// Creates a pending request.
    #[must_use]
    pub fn new(id: &str, tool: &str, pattern: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            tool: tool.to_string(),
            pattern: pattern.map(String::from),
            decision: PermissionDecision::Pending,
            always_allow: false,
        }
    }

    /// Returns the recorded decision.
    #[must_use]
    pub fn decision(&self) -> PermissionDecision {
        self.decision
    }

    /// Returns `true` once a decision has been recorded.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.decision != PermissionDecision::Pending
    }

    /// Returns `true` if the approval was sent with always-allow.
    #[must_use]
    pub fn always_allow(&self) -> bool {
        self.always_allow
    }

    /// A human-readable description for the prompt.
    #[must_use]
    pub fn description(&self) -> String {
        match &self.pattern {
            Some(pattern) => format!("{} wants to run `{}`", self.tool, pattern),
            None => format!("{} wants to run", self.tool),
        }
    }
}

/// Outcome of registering an inbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    /// New pending request; the user must decide.
    Prompt,
    /// Auto-approve is on; send this response right away.
    AutoApproved(Outbound),
    /// The id is already known; nothing to do.
    Duplicate,
}

/// Tracks permission requests by correlation id.
#[derive(Debug, Clone, Default)]
pub struct PermissionRegistry {
    requests: HashMap<String, PermissionRequest>,
    order: Vec<String>,
    auto_approve: bool,
}

impl PermissionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an inbound request.
    pub fn register(&mut self, id: &str, tool: &str, pattern: Option<&str>) -> Registration {
        if self.requests.contains_key(id) {
            debug!(id = %id, "Duplicate permission request ignored");
            return Registration::Duplicate;
        }

        let mut request = PermissionRequest::new(id, tool, pattern);
        let registration = if self.auto_approve {
            request.decision = PermissionDecision::Approved;
            debug!(id = %id, tool = %tool, "Permission auto-approved");
            Registration::AutoApproved(response_message(id, true, false))
        } else {
            debug!(id = %id, tool = %tool, pattern = ?pattern, "Permission requested");
            Registration::Prompt
        };

        self.requests.insert(id.to_string(), request);
        self.order.push(id.to_string());
        registration
    }

    /// Resolves a request.
    ///
    /// Returns the response to send, or `None` if the id is unknown or was
    /// already resolved.
    pub fn resolve(&mut self, id: &str, response: PermissionResponse) -> Option<Outbound> {
        let request = self.requests.get_mut(id)?;
        if request.is_resolved() {
            debug!(id = %id, decision = ?request.decision, "Permission already resolved");
            return None;
        }

        request.decision = response.decision();
        request.always_allow = response == PermissionResponse::AllowAlways;
        debug!(id = %id, response = ?response, "Permission resolved");

        Some(response_message(
            id,
            request.decision == PermissionDecision::Approved,
            request.always_allow,
        ))
    }

    /// Approves a request and turns on auto-approval for all future requests.
    ///
    /// Returns the permission response followed by the settings update, or an
    /// empty vector if the id is unknown or already resolved.
    pub fn enable_auto_approve(&mut self, id: &str) -> Vec<Outbound> {
        let Some(response) = self.resolve(id, PermissionResponse::AllowOnce) else {
            return Vec::new();
        };
        self.auto_approve = true;
        vec![
            response,
            Outbound::UpdateSettings {
                settings: SettingsPatch::auto_approve(),
            },
        ]
    }

    /// Returns whether auto-approval is on.
    #[must_use]
    pub fn auto_approve(&self) -> bool {
        self.auto_approve
    }

    /// Mirrors the host's auto-approval setting.
    pub fn set_auto_approve(&mut self, enabled: bool) {
        self.auto_approve = enabled;
    }

    /// Returns a request by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PermissionRequest> {
        self.requests.get(id)
    }

    /// Returns pending requests in arrival order.
    pub fn pending(&self) -> impl Iterator<Item = &PermissionRequest> {
        self.order
            .iter()
            .filter_map(|id| self.requests.get(id))
            .filter(|request| !request.is_resolved())
    }

    /// Forgets every request. Auto-approval is kept.
    pub fn clear(&mut self) {
        self.requests.clear();
        self.order.clear();
    }
}

fn response_message(id: &str, approved: bool, always_allow: bool) -> Outbound {
    Outbound::PermissionResponse {
        id: id.to_string(),
        approved,
        always_allow,
    }
}
