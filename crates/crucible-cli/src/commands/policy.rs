//! `crucible policy` - show the resolved verification policy.

use anyhow::Result;
use colored::Colorize;
use crucible_ssl::{ssl_verify, VerifyPolicy};

pub fn execute() -> Result<()> {
    match ssl_verify() {
        VerifyPolicy::Disabled => {
            println!("{}", "Verification DISABLED (insecure)".red().bold());
        }
        VerifyPolicy::SystemTrust => {
            println!("Verification enabled, platform default trust store");
        }
        VerifyPolicy::CustomBundle(path) => {
            println!("Verification enabled, custom CA bundle: {}", path.display());
        }
    }
    Ok(())
}
