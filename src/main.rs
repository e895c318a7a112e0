#![forbid(unsafe_code)]

mod apply;
mod backend;
mod constants;
mod daemon;
mod dock;
mod engine;
mod error;
mod hooks;
mod profile;
mod resolve;
mod snapshot;
mod topology;
mod validate;
mod xrandr;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{Level as TraceLevel, info};
use tracing_subscriber::FmtSubscriber;

use dock::DockState;
use engine::Engine;
use profile::ProfileStore;
use xrandr::XrandrBackend;

#[derive(Parser)]
#[command(name = "dockd", version, about = "Dock-state display topology daemon")]
struct Cli {
    /// Directory holding the dock-state profiles
    #[arg(long, value_name = "DIR")]
    profile_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture the live topology into the profile for the given state
    Config { state: DockState },
    /// Apply the saved profile for the given state once
    Set { state: DockState },
    /// Run the dock daemon
    Daemon,
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let store = ProfileStore::new(
        cli.profile_dir
            .unwrap_or_else(ProfileStore::default_dir),
    );
    let engine = Engine::new(store);

    match cli.command {
        Command::Config { state } => {
            let mut backend = XrandrBackend::connect()?;
            let path = engine.snapshot_and_save(&mut backend, state)?;
            info!(path = %path.display(), "profile written");
            println!("profile written to {}", path.display());
        }
        Command::Set { state } => {
            let mut backend = XrandrBackend::connect()?;
            engine.reconcile(&mut backend, state)?;
            println!("{state} profile applied");
        }
        Command::Daemon => daemon::run(engine)?,
    }
    Ok(())
}
