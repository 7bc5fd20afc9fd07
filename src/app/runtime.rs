//! Event loop.
//!
//! The runtime owns the [`AppState`], feeds events to the reducer one at a
//! time and carries out the returned effects: sending to the host, driving
//! the status ticker, arming notice timers and publishing view events.
//!
//! ```text
//! host inbound ─┐
//! user actions ─┼─▶ select! (biased) ─▶ update() ─▶ effects ─┬─▶ Outbox
//! status tick  ─┤                                            ├─▶ ticker / timers
//! notice timer ─┘                                            └─▶ broadcast<ViewEvent>
//! ```

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::effect::Effect;
use super::event::{AppEvent, UserAction};
use super::state::AppState;
use super::update::update;
use super::view::ViewEvent;
use crate::channel::{Inbound, Outbox};
use crate::notices::NoticeId;
use crate::types::Config;

const VIEW_CHANNEL_CAPACITY: usize = 256;

pub struct Runtime<O: Outbox> {
    state: AppState,
    outbox: O,
    view_tx: broadcast::Sender<ViewEvent>,
    ticker: Option<Interval>,
    timers: HashMap<NoticeId, JoinHandle<()>>,
    expired_tx: mpsc::UnboundedSender<NoticeId>,
    expired_rx: mpsc::UnboundedReceiver<NoticeId>,
}

impl<O: Outbox> Runtime<O> {
    pub fn new(config: Config, outbox: O) -> Self {
        let (view_tx, _) = broadcast::channel(VIEW_CHANNEL_CAPACITY);
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        Self {
            state: AppState::new(config),
            outbox,
            view_tx,
            ticker: None,
            timers: HashMap::new(),
            expired_tx,
            expired_rx,
        }
    }

    /// Subscribes to view events.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.view_tx.subscribe()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn outbox(&self) -> &O {
        &self.outbox
    }

    pub fn outbox_mut(&mut self) -> &mut O {
        &mut self.outbox
    }

    /// Returns `true` while the status ticker is running.
    pub fn ticker_active(&self) -> bool {
        self.ticker.is_some()
    }

    /// Number of armed notice timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Reduces one event and executes its effects.
    pub fn dispatch(&mut self, event: impl Into<AppEvent>) {
        let now = Instant::now().into_std();
        let effects = update(&mut self.state, event.into(), now);
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Send(message) => {
                let kind = message.message_type();
                if let Err(e) = self.outbox.send(message) {
                    warn!(kind, "Send failed: {e}");
                }
            }
            Effect::StartStatusTicker { period } => {
                let mut ticker = time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                self.ticker = Some(ticker);
            }
            Effect::StopStatusTicker => self.ticker = None,
            Effect::ScheduleDismiss { id, after } => self.arm_timer(id, after),
            Effect::CancelDismiss { id } => {
                if let Some(handle) = self.timers.remove(&id) {
                    handle.abort();
                }
            }
            Effect::CancelAllDismissals => self.abort_timers(),
            Effect::View(event) => {
                // No subscribers is fine.
                let _ = self.view_tx.send(event);
            }
        }
    }

    fn arm_timer(&mut self, id: NoticeId, after: Duration) {
        let tx = self.expired_tx.clone();
        let handle = tokio::spawn(async move {
            time::sleep(after).await;
            let _ = tx.send(id);
        });
        if let Some(previous) = self.timers.insert(id, handle) {
            previous.abort();
        }
    }

    fn abort_timers(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }

    /// Runs until the host or the user side closes.
    ///
    /// Returns the runtime so the caller can inspect or shut down what is
    /// left.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<Inbound>,
        mut actions: mpsc::Receiver<UserAction>,
    ) -> Self {
        info!(session = %self.state.session.id(), "Orchestrator running");

        loop {
            tokio::select! {
                biased;

                message = inbound.recv() => match message {
                    Some(message) => self.dispatch(message),
                    None => {
                        warn!("Host channel closed");
                        break;
                    }
                },

                action = actions.recv() => match action {
                    Some(action) => self.dispatch(action),
                    None => {
                        debug!("User side closed");
                        break;
                    }
                },

                _ = next_tick(&mut self.ticker) => self.dispatch(AppEvent::Tick),

                Some(id) = self.expired_rx.recv() => {
                    self.timers.remove(&id);
                    self.dispatch(AppEvent::NoticeExpired(id));
                }
            }
        }

        self.shutdown();
        self
    }

    /// Stops the ticker and aborts every notice timer.
    pub fn shutdown(&mut self) {
        self.ticker = None;
        self.abort_timers();
    }
}

impl<O: Outbox> Drop for Runtime<O> {
    fn drop(&mut self) {
        self.abort_timers();
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker.as_mut() {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
