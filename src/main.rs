//! Stagehand CLI entry point.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use stagehand::cli::{Cli, CommandDispatcher};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries only the JSON report.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("stagehand=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stagehand=info"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Stagehand starting");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let dispatcher = CommandDispatcher::new();
    let code = match dispatcher.dispatch(&cli, &mut out) {
        Ok(result) => result.exit_code,
        Err(e) => {
            tracing::error!("Error: {}", e);
            1
        }
    };
    let _ = out.flush();
    ExitCode::from(code as u8)
}
