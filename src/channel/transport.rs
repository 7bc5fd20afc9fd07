//! Stdio transport to the agent host.
//!
//! The host is spawned as a child process. Outbound messages are written to
//! its stdin as newline-delimited JSON by a writer task; its stdout is read
//! line by line by a reader task, decoded, and forwarded to the runtime.
//! Lines that fail to decode are logged and dropped.
//!
//! # Example
//!
//! ```ignore
//! use tether::channel::transport::HostProcess;
//! use tether::channel::{Outbound, Outbox};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (mut host, mut inbound) = HostProcess::spawn("agent-host", &["--stdio".to_string()])?;
//!     let mut outbox = host.outbox();
//!     outbox.send(Outbound::GetSettings {})?;
//!     if let Some(message) = inbound.recv().await {
//!         println!("{message:?}");
//!     }
//!     host.stop().await;
//!     Ok(())
//! }
//! ```

use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::protocol::{decode_inbound, encode_outbound, Inbound, Outbound};
use super::MpscOutbox;
use crate::error::TetherError;

/// Message sent to the writer task.
enum WriterMessage {
    /// Send an encoded line to the host.
    Send { data: String },
    /// Stop the writer task.
    Stop,
}

/// A running agent host process.
pub struct HostProcess {
    command: String,
    child: Option<Child>,
    writer_tx: Option<mpsc::UnboundedSender<WriterMessage>>,
    outbound_tx: mpsc::UnboundedSender<Outbound>,
}

impl HostProcess {
    /// Spawns the host and starts the I/O tasks.
    ///
    /// Returns the process handle and the receiver of decoded inbound messages.
    /// The receiver closes when the host's stdout reaches EOF.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned.
    pub fn spawn(command: &str, args: &[String]) -> Result<(Self, mpsc::Receiver<Inbound>)> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn host command: {}", command))?;

        let stdin = child.stdin.take().ok_or_else(|| anyhow!("No stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow!("No stdout"))?;

        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<WriterMessage>();
        let (inbound_tx, inbound_rx) = mpsc::channel::<Inbound>(256);
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();

        // Encoder: typed outbound messages -> writer lines
        let encoder_tx = writer_tx.clone();
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                match encode_outbound(&message) {
                    Ok(data) => {
                        debug!(kind = message.message_type(), "Sending to host");
                        if encoder_tx.send(WriterMessage::Send { data }).is_err() {
                            break;
                        }
                    }
                    Err(e) => error!("Failed to encode outbound message: {e}"),
                }
            }
        });

        // Writer
        let mut stdin = stdin;
        tokio::spawn(async move {
            while let Some(msg) = writer_rx.recv().await {
                match msg {
                    WriterMessage::Send { data } => {
                        if let Err(e) = stdin.write_all(data.as_bytes()).await {
                            error!("Failed to write to host stdin: {e}");
                            break;
                        }
                        if let Err(e) = stdin.write_all(b"\n").await {
                            error!("Failed to write newline: {e}");
                            break;
                        }
                        if let Err(e) = stdin.flush().await {
                            error!("Failed to flush host stdin: {e}");
                            break;
                        }
                    }
                    WriterMessage::Stop => break,
                }
            }
        });

        // Reader
        let mut reader = BufReader::new(stdout);
        tokio::spawn(async move {
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let Ok(line) = std::str::from_utf8(&buf) else {
                            let error = TetherError::protocol("host line is not valid UTF-8");
                            warn!("Dropping malformed host message: {error}");
                            continue;
                        };
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match decode_inbound(trimmed) {
                            Ok(Some(message)) => {
                                if inbound_tx.send(message).await.is_err() {
                                    break;
                                }
                            }
                            Ok(None) => debug!(line = %trimmed, "Ignoring unknown host message"),
                            Err(e) => warn!("Dropping malformed host message: {e}"),
                        }
                    }
                    Err(e) => {
                        error!("Failed to read from host stdout: {e}");
                        break;
                    }
                }
            }
            debug!("Host stdout closed");
        });

        Ok((
            Self {
                command: command.to_string(),
                child: Some(child),
                writer_tx: Some(writer_tx),
                outbound_tx,
            },
            inbound_rx,
        ))
    }

    /// Returns an outbox that sends to this host.
    #[must_use]
    pub fn outbox(&self) -> MpscOutbox {
        MpscOutbox::new(self.outbound_tx.clone())
    }

    /// Returns the host command name.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Stops the writer and kills the host process.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.writer_tx.take() {
            let _ = tx.send(WriterMessage::Stop);
        }

        if let Some(mut child) = self.child.take() {
            let _ = child.kill().await;
            let _ = child.wait().await;
        }
    }
}
