//! Application core
//!
//! - [`state`] - the state bundle and derived views (`busy`, status line)
//! - [`event`] - reducer inputs
//! - [`effect`] - reducer outputs
//! - [`update`] - the reducer
//! - [`runtime`] - tokio event loop executing effects
//! - [`view`] - presentation port

pub mod effect;
pub mod event;
pub mod runtime;
pub mod state;
pub mod update;
pub mod view;

use std::io::BufRead;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

pub use effect::Effect;
pub use event::{AppEvent, UserAction};
pub use runtime::Runtime;
pub use state::AppState;
pub use view::ViewEvent;

pub use crate::types::Config;

use crate::channel::transport::HostProcess;
use crate::commands::{self, ConsoleCommand};

/// Spawns the host and runs a line-oriented console against it.
pub async fn run(config: Config, host_command: &str, host_args: &[String]) -> Result<()> {
    let (mut host, inbound) = HostProcess::spawn(host_command, host_args)
        .with_context(|| format!("Failed to start host: {}", host_command))?;
    info!(command = host.command(), "Host started");

    let mut runtime = Runtime::new(config, host.outbox());
    let views = runtime.subscribe();
    let printer = tokio::spawn(print_views(views));

    // Ask for settings up front so auto-approve and thinking mode are mirrored.
    runtime.dispatch(UserAction::RequestSettings);

    // Blocking stdin lives on its own thread so it never holds up shutdown.
    let (actions_tx, actions_rx) = mpsc::channel(32);
    std::thread::spawn(move || read_console(&actions_tx));

    let runtime = runtime.run(inbound, actions_rx).await;
    debug!(session = %runtime.state().session.id(), "Orchestrator stopped");
    drop(runtime);

    printer.abort();
    host.stop().await;
    Ok(())
}

fn read_console(actions: &mpsc::Sender<UserAction>) {
    for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else {
            return;
        };
        match commands::parse(&line) {
            Ok(ConsoleCommand::Actions(batch)) => {
                for action in batch {
                    if actions.blocking_send(action).is_err() {
                        return;
                    }
                }
            }
            Ok(ConsoleCommand::Help) => println!("{}", commands::HELP),
            Ok(ConsoleCommand::Quit) => return,
            Ok(ConsoleCommand::Nothing) => {}
            Err(usage) => eprintln!("{}", usage),
        }
    }
}

async fn print_views(mut views: broadcast::Receiver<ViewEvent>) {
    loop {
        match views.recv().await {
            // Status ticks are too chatty for a line console.
            Ok(ViewEvent::Status { .. }) => {}
            Ok(event) => println!("{}", event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "View printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
