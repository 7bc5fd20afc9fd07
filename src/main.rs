//! Tether - headless console for an agent host

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tether::app;
use tether::types::Config;

#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(about = "Tether - drive an agent host session from the console")]
#[command(version)]
struct Args {
    /// Config file (defaults to the platform config dir)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging (written to a temp file)
    #[arg(long)]
    debug: bool,

    /// Ask the host for extended thinking on every request
    #[arg(long)]
    thinking: bool,

    /// Host command to spawn
    #[arg(value_name = "HOST_CMD", required = true)]
    host: String,

    /// Arguments passed to the host command
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    host_args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.debug)?;

    let mut config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if args.thinking {
        config = config.with_thinking_mode(true);
    }
    config.validate().context("Invalid configuration")?;

    app::run(config, &args.host, &args.host_args).await
}

fn init_tracing(debug: bool) -> Result<()> {
    let filter = if debug { "debug" } else { "info" };

    if debug {
        // The console owns stdout; logs go to a file so they do not interleave.
        let log_path = std::env::temp_dir().join("tether.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| filter.into()),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
            .init();

        eprintln!("Debug logs written to: {}", log_path.display());
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| filter.into()),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}
