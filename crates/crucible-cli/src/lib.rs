//! CLI wiring for the crucible diagnostics tool.

pub mod args;
mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;

/// Run the CLI application.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Diagnose(args) => commands::diagnose::execute(&args),
        Commands::Explain(args) => commands::explain::execute(&args),
        Commands::Export(args) => commands::export::execute(&args),
        Commands::Policy => commands::policy::execute(),
    }
}

/// Log to stderr so reports on stdout stay pipeable.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
