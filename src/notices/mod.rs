//! Ephemeral notices shown to the user.
//!
//! A notice may carry a time-to-live. The board only records it; the runtime
//! owns the timer and reports expiry back through the reducer, so a notice
//! that was already replaced or dismissed simply fails to dismiss again.

use std::fmt;
use std::time::Duration;

/// Identifies a notice. Ids are never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoticeId(u64);

impl fmt::Display for NoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Notice severity / purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
    /// A compaction is in progress.
    Compacting,
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Success => "ok",
            Self::Warning => "warn",
            Self::Error => "error",
            Self::Compacting => "compacting",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    pub kind: NoticeKind,
    pub text: String,
    /// Auto-dismiss delay. `None` keeps the notice until dismissed.
    pub ttl: Option<Duration>,
}

/// The notices currently showing.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    next_id: u64,
    notices: Vec<Notice>,
}

impl NoticeBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows a notice and returns its id.
    pub fn push(
        &mut self,
        kind: NoticeKind,
        text: impl Into<String>,
        ttl: Option<Duration>,
    ) -> NoticeId {
        self.next_id += 1;
        let id = NoticeId(self.next_id);
        self.notices.push(Notice {
            id,
            kind,
            text: text.into(),
            ttl,
        });
        id
    }

    /// Removes a notice. Returns `false` if it was not showing.
    pub fn dismiss(&mut self, id: NoticeId) -> bool {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.id != id);
        self.notices.len() != before
    }

    #[must_use]
    pub fn get(&self, id: NoticeId) -> Option<&Notice> {
        self.notices.iter().find(|notice| notice.id == id)
    }

    /// Notices in the order they were shown.
    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    /// Removes every notice. Ids keep increasing.
    pub fn clear(&mut self) {
        self.notices.clear();
    }
}
