//! crucible - SSL/TLS trust diagnostics for corporate networks.

use anyhow::Result;

fn main() -> Result<()> {
    crucible_cli::run()
}
