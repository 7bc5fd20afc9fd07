//! Centralized error types for tether.
//!
//! This module provides a unified error type (`TetherError`) covering every
//! failure the orchestrator can observe. Each variant belongs to one of the
//! categories the session cares about:
//!
//! - **Protocol** errors are logged and dropped, never surfaced.
//! - **Host operation** and **restore** failures are surfaced inline and leave
//!   the session usable.
//! - **State races** are handled silently by the state machine.
//! - **Blocking** errors need action outside the orchestrator (install, login).
//!
//! # Example
//!
//! ```
//! use tether::error::{TetherError, TetherResult};
//!
//! fn require_text(text: &str) -> TetherResult<&str> {
//!     if text.trim().is_empty() {
//!         return Err(TetherError::protocol("empty message text"));
//!     }
//!     Ok(text)
//! }
//!
//! let err = require_text("  ").unwrap_err();
//! assert!(err.is_recoverable());
//! assert!(!err.should_surface());
//! ```

use std::fmt;

/// Result type alias using `TetherError`.
pub type TetherResult<T> = Result<T, TetherError>;

/// Why the session is blocked until something outside the orchestrator happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockingReason {
    /// The agent host binary is not installed.
    InstallRequired,
    /// The agent host needs the user to log in.
    LoginRequired {
        /// Host-provided hint (for example the login command to run).
        message: String,
    },
}

impl fmt::Display for BlockingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstallRequired => write!(f, "agent host is not installed"),
            Self::LoginRequired { message } if message.is_empty() => {
                write!(f, "login required")
            }
            Self::LoginRequired { message } => write!(f, "login required: {}", message),
        }
    }
}

/// Centralized error type for tether.
#[derive(Debug)]
pub enum TetherError {
    // ============== Channel Errors ==============
    /// Unknown or malformed inbound message.
    Protocol {
        /// Description of what could not be decoded.
        message: String,
    },

    /// The transport to the host failed (spawn, closed pipe, write error).
    Channel {
        /// Description of the transport failure.
        message: String,
    },

    // ============== Host Errors ==============
    /// The agent or one of its tools failed while handling a request.
    HostOperation {
        /// Error text reported by the host.
        message: String,
    },

    /// The host could not roll back state for an edited turn.
    RestoreFailure {
        /// Turn index the edit targeted.
        index: usize,
        /// Error text reported by the host.
        message: String,
    },

    /// The host cannot serve requests until the user acts outside the client.
    Blocking {
        /// What the user has to do.
        reason: BlockingReason,
    },

    // ============== State Errors ==============
    /// A delayed host signal conflicted with a local transition.
    StateRace {
        /// Description of the conflicting signal.
        message: String,
    },

    // ============== Config Errors ==============
    /// Invalid configuration value.
    Config {
        /// Description of the invalid value.
        message: String,
    },

    // ============== Wrapped Errors ==============
    /// Error from anyhow or other sources.
    Other {
        /// The wrapped error message.
        message: String,
        /// The original error, if available.
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

// ============== Constructor Methods ==============

impl TetherError {
    /// Creates a protocol error.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a channel error.
    #[must_use]
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    /// Creates a host operation error.
    #[must_use]
    pub fn host_operation(message: impl Into<String>) -> Self {
        Self::HostOperation {
            message: message.into(),
        }
    }

    /// Creates a restore failure for the given turn index.
    #[must_use]
    pub fn restore_failure(index: usize, message: impl Into<String>) -> Self {
        Self::RestoreFailure {
            index,
            message: message.into(),
        }
    }

    /// Creates a blocking error.
    #[must_use]
    pub fn blocking(reason: BlockingReason) -> Self {
        Self::Blocking { reason }
    }

    /// Creates a state race warning.
    #[must_use]
    pub fn state_race(message: impl Into<String>) -> Self {
        Self::StateRace {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

// ============== Category Methods ==============

impl TetherError {
    /// Returns `true` if the session stays open for further turns after this error.
    ///
    /// Only blocking errors require action outside the orchestrator.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Blocking { .. })
    }

    /// Returns `true` if the error should be shown to the user.
    ///
    /// Protocol errors and state races are only logged.
    #[must_use]
    pub fn should_surface(&self) -> bool {
        !matches!(self, Self::Protocol { .. } | Self::StateRace { .. })
    }

    /// Returns the module name where this error originated.
    #[must_use]
    pub fn module(&self) -> &'static str {
        match self {
            Self::Protocol { .. } | Self::Channel { .. } => "channel",
            Self::HostOperation { .. } => "session",
            Self::RestoreFailure { .. } => "restore",
            Self::Blocking { .. } => "session",
            Self::StateRace { .. } => "automode",
            Self::Config { .. } => "config",
            Self::Other { .. } => "unknown",
        }
    }
}

// ============== Display Implementation ==============

impl fmt::Display for TetherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol { message } => write!(f, "channel: protocol error: {}", message),
            Self::Channel { message } => write!(f, "channel: transport error: {}", message),
            Self::HostOperation { message } => write!(f, "host: {}", message),
            Self::RestoreFailure { index, message } => {
                write!(f, "restore: turn {} could not be restored: {}", index, message)
            }
            Self::Blocking { reason } => write!(f, "blocked: {}", reason),
            Self::StateRace { message } => write!(f, "automode: state race: {}", message),
            Self::Config { message } => write!(f, "config: {}", message),
            Self::Other { message, .. } => write!(f, "error: {}", message),
        }
    }
}

// ============== Error Implementation ==============

impl std::error::Error for TetherError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Other {
                source: Some(src), ..
            } => Some(src.as_ref()),
            _ => None,
        }
    }
}

// ============== Conversion Implementations ==============

impl From<anyhow::Error> for TetherError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            message: format!("{:#}", err),
            source: None,
        }
    }
}

impl From<serde_json::Error> for TetherError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for TetherError {
    fn from(err: std::io::Error) -> Self {
        Self::Channel {
            message: err.to_string(),
        }
    }
}
