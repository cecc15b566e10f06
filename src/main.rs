mod agents;
mod cache;
mod cli;
mod error;
mod npm;
mod registry;
mod utils;
mod workflow;

use clap::Parser;
use cli::Cli;
use colored::Colorize;
use error::Result;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use workflow::{RunOptions, RunOutcome};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = std::env::current_dir()
        .map_err(Into::into)
        .and_then(|cwd| cli.into_options(cwd))
        .and_then(|options| run(&options));

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(options: &RunOptions) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    match runtime.block_on(workflow::execute_update(options))? {
        RunOutcome::Written { path, updates } => {
            debug!(path = %path.display(), updates, "manifest updated");
        }
        RunOutcome::Printed { updates } => debug!(updates, "manifest printed"),
        RunOutcome::UpToDate => debug!("nothing to update"),
    }
    Ok(())
}

/// Diagnostics go to stderr so `--json` output stays machine readable.
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "odc=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
