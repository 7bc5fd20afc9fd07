//! Events fed to the reducer.

use crate::channel::{Inbound, SettingsPatch};
use crate::notices::NoticeId;
use crate::permissions::PermissionResponse;

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A decoded message from the host.
    Host(Inbound),
    /// Something the user did.
    User(UserAction),
    /// Status ticker fired.
    Tick,
    /// A notice's auto-dismiss timer elapsed.
    NoticeExpired(NoticeId),
}

/// User intents, independent of how they were entered.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    Send { text: String },
    StartAutoMode { text: String },
    Stop,
    ResolvePermission { id: String, response: PermissionResponse },
    EnableAutoApprove { id: String },
    BeginEdit { index: usize },
    ConfirmEdit { text: String },
    CancelEdit,
    CompactContext,
    NewSession,
    RequestSettings,
    UpdateSettings(SettingsPatch),
    TogglePlanMode,
    ToggleThinkingMode,
    DismissNotice(NoticeId),
}

impl From<Inbound> for AppEvent {
    fn from(message: Inbound) -> Self {
        Self::Host(message)
    }
}

impl From<UserAction> for AppEvent {
    fn from(action: UserAction) -> Self {
        Self::User(action)
    }
}
