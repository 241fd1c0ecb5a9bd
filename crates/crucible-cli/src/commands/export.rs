//! `crucible export` - export macOS keychain certificates.

use anyhow::{bail, Result};
use crucible_ssl::export_keychain_certificates;

use crate::args::ExportArgs;

pub fn execute(args: &ExportArgs) -> Result<()> {
    let (success, message) = export_keychain_certificates(args.output.as_deref());
    if !success {
        bail!(message);
    }
    println!("{message}");
    Ok(())
}
