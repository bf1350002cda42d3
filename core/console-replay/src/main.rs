//! console-replay: drives the console core from recorded node responses.
//!
//! Loads a fixture of per-node and aggregate responses, runs the engine on
//! its event loop until the watched view has refreshed `--cycles` times, and
//! prints the final tree and every published detail grid as JSON.
//!
//! Set `CONSOLE_DEBUG_LOG=1` for debug logging on stderr.

mod fixture;
mod replay;

use clap::Parser;
use console_core::{load_config, ConsoleError};
use replay::{replay, ReplayOptions};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "console-replay")]
#[command(about = "Replay recorded router responses through the console core")]
#[command(version)]
struct Cli {
    /// Fixture file with recorded responses
    #[arg(long, value_name = "PATH")]
    fixture: PathBuf,

    /// Console config file (defaults to ~/.qdr-console/console.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Publications of the watched view to wait for
    #[arg(long, default_value_t = 1)]
    cycles: usize,

    /// Tree key to activate after start (category name or leaf key)
    #[arg(long, value_name = "KEY")]
    activate: Option<String>,

    /// Give up after this many milliseconds
    #[arg(long, default_value_t = 30_000)]
    deadline_ms: u64,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(report) => println!("{report}"),
        Err(err) => {
            tracing::error!(error = %err, "console-replay failed");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<String, ConsoleError> {
    let config = load_config(cli.config)?;
    let fixture = fixture::load_fixture(&cli.fixture)?;
    tracing::info!(
        nodes = fixture.nodes.len(),
        interval_ms = config.refresh_interval().as_millis() as u64,
        "Replaying fixture"
    );

    let report = replay(
        fixture,
        config,
        ReplayOptions {
            activate: cli.activate,
            cycles: cli.cycles,
            deadline: Duration::from_millis(cli.deadline_ms),
        },
    );
    serde_json::to_string_pretty(&report).map_err(|source| ConsoleError::Json {
        context: "serializing replay report".to_string(),
        source,
    })
}

fn init_logging() {
    let debug_enabled = env::var("CONSOLE_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
