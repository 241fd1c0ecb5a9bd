//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Diagnose SSL/TLS trust problems on corporate networks
///
/// Resolves your effective verification policy, checks the configured
/// CA bundle, and probes a live handshake to explain what is broken
/// and how to fix it.
#[derive(Parser, Debug)]
#[command(name = "crucible")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run full diagnostics against a host
    Diagnose(DiagnoseArgs),

    /// Explain a TLS error message with full diagnostics
    Explain(ExplainArgs),

    /// Export macOS keychain certificates to a PEM bundle
    Export(ExportArgs),

    /// Show the resolved TLS verification policy
    Policy,
}

#[derive(Args, Debug)]
pub struct DiagnoseArgs {
    /// Host to probe
    #[arg(long, default_value = crucible_ssl::DEFAULT_TEST_HOST)]
    pub host: String,

    /// Emit the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// The error message to classify and explain
    pub message: String,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output path (default: ~/crucible-ca-bundle.pem)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
