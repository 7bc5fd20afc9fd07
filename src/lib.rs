//! Tether - client-side session orchestrator for agent hosts
//!
//! Drives one conversation with a long-running agent host over a typed
//! `{type, data}` message channel: request lifecycle, the plan-then-execute
//! AutoMode, permission correlation, edit-and-restore, and usage/context
//! monitoring.
//!
//! This library exposes the core types and the reducer for testing and
//! embedding.

pub mod app;
pub mod automode;
pub mod channel;
pub mod commands;
pub mod error;
pub mod notices;
pub mod permissions;
pub mod restore;
pub mod session;
pub mod transcript;
pub mod types;
pub mod usage;
pub mod util;

// Re-export core types for convenient access
pub use app::{AppEvent, AppState, Effect, Runtime, UserAction, ViewEvent};
pub use channel::{Inbound, Outbound, Outbox};
pub use error::{TetherError, TetherResult};
pub use types::Config;
