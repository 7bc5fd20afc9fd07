//! Side effects requested by the reducer.
//!
//! The reducer never touches the channel or timers directly. It returns these
//! descriptions and the runtime carries them out in order.

use std::time::Duration;

use super::view::ViewEvent;
use crate::channel::Outbound;
use crate::notices::NoticeId;

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a message to the host.
    Send(Outbound),
    /// Start refreshing the status line every `period`.
    StartStatusTicker { period: Duration },
    StopStatusTicker,
    /// Dismiss a notice after `after` unless cancelled first.
    ScheduleDismiss { id: NoticeId, after: Duration },
    CancelDismiss { id: NoticeId },
    CancelAllDismissals,
    /// Publish to the presentation layer.
    View(ViewEvent),
}

impl Effect {
    /// Returns the outbound message if this is a send.
    pub fn as_send(&self) -> Option<&Outbound> {
        match self {
            Self::Send(message) => Some(message),
            _ => None,
        }
    }
}
