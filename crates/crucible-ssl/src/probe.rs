//! Live TLS handshake testing via `openssl s_client`.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::exec::{CommandRunner, ExecError};

/// Default TLS port.
pub const DEFAULT_PORT: u16 = 443;

/// Handshake probe timeout.
const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Cap on raw tool output reported as a failure reason.
const MAX_REASON_LEN: usize = 500;

/// Perform a verification handshake against `host:port`.
///
/// When `bundle` is given, it is used as the sole trust source.
/// No application data is sent; the connection closes right after
/// the handshake. Returns `(success, output)`: on success the full
/// tool output, on failure the best available reason. Never panics;
/// a missing tool and a timeout are distinct failure reasons.
pub fn probe_handshake(
    runner: &dyn CommandRunner,
    host: &str,
    port: u16,
    bundle: Option<&Path>,
) -> (bool, String) {
    let target = format!("{host}:{port}");
    let bundle_str = bundle.map(|p| p.display().to_string());

    let mut args = vec!["s_client", "-connect", target.as_str(), "-verify", "5"];
    if let Some(ca) = bundle_str.as_deref() {
        args.push("-CAfile");
        args.push(ca);
    }

    // Empty stdin closes the connection once the handshake completes.
    let output = match runner.run("openssl", &args, "", PROBE_TIMEOUT) {
        Ok(out) => out,
        Err(ExecError::Missing { .. }) => {
            return (false, "openssl command not available".to_string());
        }
        Err(ExecError::Timeout(_)) => return (false, "Connection timed out".to_string()),
        Err(e) => return (false, e.to_string()),
    };

    let combined = output.combined();
    debug!(host, port, status = ?output.status, "handshake probe finished");

    if combined.contains("Verify return code: 0 (ok)") {
        return (true, combined);
    }

    // First line naming a verification failure is the reason.
    for line in combined.lines() {
        if line.to_lowercase().contains("verify error:") {
            return (false, line.trim().to_string());
        }
        if line.contains("Verify return code:") {
            return (false, line.trim().to_string());
        }
    }

    if !output.success() {
        return (false, tail(&combined, MAX_REASON_LEN).to_string());
    }

    (false, "Unknown SSL error".to_string())
}

/// Last `max` characters of `s`, respecting char boundaries.
fn tail(s: &str, max: usize) -> &str {
    let count = s.chars().count();
    if count <= max {
        return s;
    }
    let skip = count - max;
    let (idx, _) = s.char_indices().nth(skip).unwrap_or((0, ' '));
    &s[idx..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::fake::FakeRunner;

    #[test]
    fn verify_return_zero_is_success() {
        let runner = FakeRunner::new().with_tool("openssl").push_ok(
            0,
            "CONNECTED(00000003)\nVerify return code: 0 (ok)\n",
            "",
        );
        let (ok, output) = probe_handshake(&runner, "example.com", 443, None);
        assert!(ok);
        assert!(output.contains("Verify return code: 0 (ok)"));
    }

    #[test]
    fn verify_error_line_is_the_reason() {
        let runner = FakeRunner::new().with_tool("openssl").push_ok(
            1,
            "CONNECTED(00000003)\n",
            "verify error:num=20:unable to get local issuer certificate\n",
        );
        let (ok, reason) = probe_handshake(&runner, "example.com", 443, None);
        assert!(!ok);
        assert_eq!(
            reason,
            "verify error:num=20:unable to get local issuer certificate"
        );
    }

    #[test]
    fn nonzero_verify_return_code_is_the_reason() {
        let runner = FakeRunner::new().with_tool("openssl").push_ok(
            0,
            "CONNECTED(00000003)\nVerify return code: 19 (self signed certificate in certificate chain)\n",
            "",
        );
        let (ok, reason) = probe_handshake(&runner, "example.com", 443, None);
        assert!(!ok);
        assert!(reason.starts_with("Verify return code: 19"));
    }

    #[test]
    fn nonzero_exit_without_verify_line_reports_truncated_output() {
        let noise = "x".repeat(800);
        let runner = FakeRunner::new()
            .with_tool("openssl")
            .push_ok(1, &noise, "");
        let (ok, reason) = probe_handshake(&runner, "example.com", 443, None);
        assert!(!ok);
        assert_eq!(reason.len(), 500);
    }

    #[test]
    fn zero_exit_without_indicators_is_unknown_error() {
        let runner = FakeRunner::new()
            .with_tool("openssl")
            .push_ok(0, "CONNECTED(00000003)\n", "");
        let (ok, reason) = probe_handshake(&runner, "example.com", 443, None);
        assert!(!ok);
        assert_eq!(reason, "Unknown SSL error");
    }

    #[test]
    fn missing_tool_is_a_distinct_reason() {
        let runner = FakeRunner::new().push_err(ExecError::Missing {
            program: "openssl".to_string(),
        });
        let (ok, reason) = probe_handshake(&runner, "example.com", 443, None);
        assert!(!ok);
        assert_eq!(reason, "openssl command not available");
    }

    #[test]
    fn timeout_is_a_distinct_reason() {
        let runner = FakeRunner::new()
            .with_tool("openssl")
            .push_err(ExecError::Timeout(PROBE_TIMEOUT));
        let (ok, reason) = probe_handshake(&runner, "example.com", 443, None);
        assert!(!ok);
        assert_eq!(reason, "Connection timed out");
    }

    #[test]
    fn bundle_is_passed_as_cafile() {
        let runner = FakeRunner::new()
            .with_tool("openssl")
            .push_ok(0, "Verify return code: 0 (ok)\n", "");
        let (ok, _) = probe_handshake(
            &runner,
            "example.com",
            8443,
            Some(Path::new("/tmp/ca.pem")),
        );
        assert!(ok);
        let calls = runner.calls.borrow();
        assert_eq!(
            calls[0],
            "openssl s_client -connect example.com:8443 -verify 5 -CAfile /tmp/ca.pem"
        );
    }

    #[test]
    fn tail_respects_char_boundaries() {
        let s = "ééééé";
        assert_eq!(tail(s, 2), "éé");
        assert_eq!(tail("short", 500), "short");
    }
}
