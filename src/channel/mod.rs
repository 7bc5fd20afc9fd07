//! Message channel between the orchestrator and the agent host.
//!
//! - [`protocol`] - typed inbound/outbound messages and envelope codec
//! - [`fields`] - lenient payload field access
//! - [`transport`] - stdio transport to a spawned host process
//!
//! The orchestrator only needs the send side through the [`Outbox`] trait;
//! inbound messages arrive at the runtime as decoded [`Inbound`] values.

pub mod fields;
pub mod protocol;
pub mod transport;

pub use protocol::{Inbound, Outbound, SettingsPatch};

use tokio::sync::mpsc;

use crate::error::{TetherError, TetherResult};

/// Fire-and-forget send side of the host channel.
pub trait Outbox {
    /// Sends a message to the host.
    ///
    /// # Errors
    ///
    /// Returns a channel error if the host side is gone.
    fn send(&mut self, message: Outbound) -> TetherResult<()>;
}

/// Outbox backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct MpscOutbox {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl MpscOutbox {
    /// Wraps a sender.
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { tx }
    }
}

impl Outbox for MpscOutbox {
    fn send(&mut self, message: Outbound) -> TetherResult<()> {
        self.tx.send(message).map_err(|e| {
            TetherError::channel(format!(
                "host channel closed, dropped {}",
                e.0.message_type()
            ))
        })
    }
}

/// Outbox that records every message, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutbox {
    sent: Vec<Outbound>,
}

impl RecordingOutbox {
    /// Creates an empty recording outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every message sent so far.
    #[must_use]
    pub fn sent(&self) -> &[Outbound] {
        &self.sent
    }

    /// Removes and returns every message sent so far.
    pub fn take(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.sent)
    }
}

impl Outbox for RecordingOutbox {
    fn send(&mut self, message: Outbound) -> TetherResult<()> {
        self.sent.push(message);
        Ok(())
    }
}
