//! Console slash commands.
//!
//! Each input line is either plain text (sent as a request) or a slash
//! command that maps to one or more [`UserAction`]s.

use crate::app::event::UserAction;
use crate::permissions::PermissionResponse;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Actions to dispatch, in order.
    Actions(Vec<UserAction>),
    Help,
    Quit,
    /// Blank line.
    Nothing,
}

pub const HELP: &str = "\
commands:
  <text>                send a request
  /auto <text>          plan, then execute autonomously
  /stop                 stop the request in flight
  /allow <id>           approve a permission request once
  /always <id>          approve and remember for this tool
  /deny <id>            deny a permission request
  /yolo <id>            approve and auto-approve everything after
  /edit <index> <text>  replace turn <index> and resubmit
  /cancel               cancel the open edit
  /compact              compact the context window
  /new                  start a new session
  /settings             show host settings
  /plan                 toggle plan mode
  /think                toggle thinking mode
  /help                 show this help
  /quit                 exit";

/// Parses one console line.
///
/// # Errors
///
/// Returns a usage message for unknown commands or missing arguments.
pub fn parse(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ConsoleCommand::Nothing);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(single(UserAction::Send {
            text: line.to_string(),
        }));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "auto" => single(UserAction::StartAutoMode {
            text: required(args, "/auto <text>")?.to_string(),
        }),
        "stop" => single(UserAction::Stop),
        "allow" => permission(args, "/allow <id>", PermissionResponse::AllowOnce)?,
        "always" => permission(args, "/always <id>", PermissionResponse::AllowAlways)?,
        "deny" => permission(args, "/deny <id>", PermissionResponse::Deny)?,
        "yolo" => single(UserAction::EnableAutoApprove {
            id: required(args, "/yolo <id>")?.to_string(),
        }),
        "edit" => edit(args)?,
        "cancel" => single(UserAction::CancelEdit),
        "compact" => single(UserAction::CompactContext),
        "new" => single(UserAction::NewSession),
        "settings" => single(UserAction::RequestSettings),
        "plan" => single(UserAction::TogglePlanMode),
        "think" => single(UserAction::ToggleThinkingMode),
        "help" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command: /{} (try /help)", other)),
    };
    Ok(command)
}

fn single(action: UserAction) -> ConsoleCommand {
    ConsoleCommand::Actions(vec![action])
}

fn required<'a>(args: &'a str, usage: &str) -> Result<&'a str, String> {
    if args.is_empty() {
        Err(format!("usage: {}", usage))
    } else {
        Ok(args)
    }
}

fn permission(
    args: &str,
    usage: &str,
    response: PermissionResponse,
) -> Result<ConsoleCommand, String> {
    let id = required(args, usage)?;
    Ok(single(UserAction::ResolvePermission {
        id: id.to_string(),
        response,
    }))
}

fn edit(args: &str) -> Result<ConsoleCommand, String> {
    const USAGE: &str = "usage: /edit <index> <text>";
    let (index, text) = args.split_once(char::is_whitespace).ok_or(USAGE)?;
    let index: usize = index.parse().map_err(|_| USAGE.to_string())?;
    let text = text.trim();
    if text.is_empty() {
        return Err(USAGE.to_string());
    }
    Ok(ConsoleCommand::Actions(vec![
        UserAction::BeginEdit { index },
        UserAction::ConfirmEdit {
            text: text.to_string(),
        },
    ]))
}
