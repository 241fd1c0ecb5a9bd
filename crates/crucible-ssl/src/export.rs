//! macOS keychain certificate export.
//!
//! Corporate proxies typically install their CA into the system
//! keychain but not into any PEM bundle a CLI tool can see. The
//! `security` tool can dump the keychain back out as PEM; this module
//! wraps that one-shot remediation.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::bundle::analyze_bundle;
use crate::env::CERT_FILE_VAR;
use crate::exec::{CommandRunner, ExecError, SystemRunner};

/// File name of the exported bundle in the user's home directory.
pub const DEFAULT_BUNDLE_NAME: &str = "crucible-ca-bundle.pem";

const SYSTEM_KEYCHAIN: &str = "/Library/Keychains/System.keychain";
const LOGIN_KEYCHAIN_REL: &str = "Library/Keychains/login.keychain-db";

/// Keychain export timeout.
const EXPORT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default export target: `~/crucible-ca-bundle.pem`.
#[must_use]
pub fn default_bundle_path() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(DEFAULT_BUNDLE_NAME),
        |dirs| dirs.home_dir().join(DEFAULT_BUNDLE_NAME),
    )
}

/// One-shot shell command exporting both keychains to `path`.
///
/// Shown to the user as the auto-fix; mirrors what
/// [`export_keychain_certificates`] does programmatically.
#[must_use]
pub fn keychain_export_command(path: &Path) -> String {
    let path = path.display();
    format!(
        "security export -t certs -f pemseq -k {SYSTEM_KEYCHAIN} -o {path} && \
         security export -t certs -f pemseq -k ~/{LOGIN_KEYCHAIN_REL} >> {path} 2>/dev/null; \
         echo \"\\nExported to {path}. Run:\\nexport {CERT_FILE_VAR}={path}\""
    )
}

/// Export macOS system certificates to a PEM bundle.
///
/// Only available on macOS with the `security` tool present. The
/// system keychain export must succeed; the login keychain is
/// appended best-effort (it may be locked). The produced file is
/// re-analyzed before success is declared. Returns
/// `(success, message)`; never panics.
pub fn export_keychain_certificates(output: Option<&Path>) -> (bool, String) {
    export_with(&SystemRunner, std::env::consts::OS, output)
}

/// [`export_keychain_certificates`] with injected runner and platform.
pub fn export_with(
    runner: &dyn CommandRunner,
    os: &str,
    output: Option<&Path>,
) -> (bool, String) {
    let login = directories::UserDirs::new().map(|dirs| dirs.home_dir().join(LOGIN_KEYCHAIN_REL));
    export_impl(runner, os, output, login.as_deref())
}

fn export_impl(
    runner: &dyn CommandRunner,
    os: &str,
    output: Option<&Path>,
    login_keychain: Option<&Path>,
) -> (bool, String) {
    if os != "macos" {
        return (false, "This function is only available on macOS".to_string());
    }
    if !runner.available("security") {
        return (false, "macOS security command not found".to_string());
    }

    let output = output.map_or_else(default_bundle_path, Path::to_path_buf);
    let output_str = output.display().to_string();

    let result = runner.run(
        "security",
        &[
            "export",
            "-t",
            "certs",
            "-f",
            "pemseq",
            "-k",
            SYSTEM_KEYCHAIN,
            "-o",
            &output_str,
        ],
        "",
        EXPORT_TIMEOUT,
    );
    let exported = match result {
        Ok(out) => out,
        Err(ExecError::Timeout(_)) => {
            return (false, "Certificate export timed out".to_string());
        }
        Err(e) => return (false, format!("Failed to export certificates: {e}")),
    };
    if !exported.success() {
        return (
            false,
            format!("Failed to export system keychain: {}", exported.stderr),
        );
    }

    append_login_keychain(runner, &output, login_keychain);

    // The export command exiting zero is not enough; confirm the file
    // actually holds certificates.
    let info = analyze_bundle(runner, &output);
    if !info.is_valid_pem || info.cert_count == 0 {
        return (false, "Export produced invalid certificate file".to_string());
    }

    (
        true,
        format!(
            "Exported {count} certificates to {output_str}\n\n\
             To use this CA bundle, run:\n  export {CERT_FILE_VAR}={output_str}\n\n\
             Add this to your ~/.zshrc or ~/.bashrc to make it permanent.",
            count = info.cert_count,
        ),
    )
}

///// Append login keychain certificates, ignoring every failure: the
/// login keychain may be locked or absent.
fn append_login_keychain(runner: &dyn CommandRunner, output: &Path, login: Option<&Path>) {
    let Some(login) = login else {
        return;
    };
    if !login.exists() {
        return;
    }

    let login_str = login.display().to_string();
    let result = runner.run(
        "security",
        &["export", "-t", "certs", "-f", "pemseq", "-k", &login_str],
        "",
        EXPORT_TIMEOUT,
    );
    match result {
        Ok(out) if out.success() && !out.stdout.is_empty() => {
            let appended = std::fs::OpenOptions::new()
                .append(true)
                .open(output)
                .and_then(|mut f| f.write_all(out.stdout.as_bytes()));
            if let Err(e) = appended {
                debug!(error = %e, "could not append login keychain certs");
            }
        }
        Ok(_) => {}
        Err(e) => debug!(error = %e, "login keychain export failed"),
    }
}
