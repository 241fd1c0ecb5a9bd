//! Certificate chain retrieval for diagnostic display.

use std::time::Duration;

use tracing::debug;

use crate::exec::CommandRunner;

/// Chain retrieval timeout.
const CHAIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Cap on chain entries kept for display.
const MAX_CHAIN_ENTRIES: usize = 10;

/// Fetch the certificate chain a host presents.
///
/// Runs `openssl s_client -showcerts` without requesting
/// verification and collects the subject (`s:`) and issuer (`i:`)
/// lines as `Server: …` / `Issuer: …` entries. Returns an empty
/// list when the tool is unavailable or the call fails.
pub fn certificate_chain(runner: &dyn CommandRunner, host: &str, port: u16) -> Vec<String> {
    if !runner.available("openssl") {
        return Vec::new();
    }

    let target = format!("{host}:{port}");
    let output = match runner.run(
        "openssl",
        &["s_client", "-connect", &target, "-showcerts"],
        "",
        CHAIN_TIMEOUT,
    ) {
        Ok(out) => out,
        Err(e) => {
            debug!(host, port, error = %e, "chain retrieval failed");
            return Vec::new();
        }
    };

    parse_chain(&output.stdout)
}

fn parse_chain(stdout: &str) -> Vec<String> {
    let mut entries = Vec::new();
    for line in stdout.lines() {
        let trimmed = line.trim();
        if let Some(subject) = trimmed.strip_prefix("s:") {
            entries.push(format!("Server: {}", subject.trim()));
        } else if let Some(issuer) = trimmed.strip_prefix("i:") {
            entries.push(format!("Issuer: {}", issuer.trim()));
        }
        if entries.len() == MAX_CHAIN_ENTRIES {
            break;
        }
    }
    entries
}
