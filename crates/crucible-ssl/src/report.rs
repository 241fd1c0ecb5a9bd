//! User-facing rendering of TLS failures.
//!
//! `explain` is the entry point network-calling code hands its error
//! text to. Unrelated errors pass through untouched; TLS-looking
//! errors trigger a full diagnostic run rendered as a structured,
//! actionable report.

use crate::diagnose::{diagnose, SslDiagnostics};
use crate::env::{CA_BUNDLE_VAR, CERT_FILE_VAR, VERIFY_VAR};
use crate::export::default_bundle_path;

/// Substrings that mark an error as TLS-related.
const TLS_KEYWORDS: &[&str] = &[
    "ssl",
    "certificate",
    "cert",
    "verify",
    "handshake",
    "tlsv1",
    "sslv3",
    "unable to get local issuer",
    "certificate verify failed",
    "self signed certificate",
];

const RULE: &str = "============================================================";

/// Whether an error message looks TLS-related.
#[must_use]
pub fn is_tls_error(message: &str) -> bool {
    let lowered = message.to_lowercase();
    TLS_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

/// Turn a connection error into an actionable explanation.
///
/// Non-TLS errors are returned verbatim; this function never
/// decorates unrelated failures. TLS errors come back as a full
/// diagnostic report the caller can surface to the user as-is.
#[must_use]
pub fn explain(message: &str) -> String {
    if !is_tls_error(message) {
        return message.to_string();
    }
    render(message, &diagnose())
}

/// Render the report for `message` from an already-computed
/// diagnostic run.
#[must_use]
pub fn render(message: &str, diag: &SslDiagnostics) -> String {
    let mut lines = vec![
        format!("SSL Certificate Error: {message}"),
        String::new(),
        RULE.to_string(),
        "SSL DIAGNOSTICS".to_string(),
        RULE.to_string(),
        String::new(),
    ];

    lines.push("Environment Variables:".to_string());
    let env_vars = [
        (CERT_FILE_VAR, diag.ssl_cert_file.as_deref()),
        (CA_BUNDLE_VAR, diag.requests_ca_bundle.as_deref()),
        (VERIFY_VAR, diag.crucible_ssl_verify.as_deref()),
    ];
    // Pad the labels so the values line up in a column.
    let width = env_vars
        .iter()
        .map(|(name, _)| name.len() + 1)
        .max()
        .unwrap_or(0);
    for (name, value) in env_vars {
        lines.push(format!(
            "  {label:<width$} {}",
            value.unwrap_or("(not set)"),
            label = format!("{name}:"),
        ));
    }
    lines.push(String::new());

    if let Some(info) = &diag.cert_file_info {
        lines.push("Certificate File Analysis:".to_string());
        lines.push(format!("  Path: {}", info.path));
        lines.push(format!("  Exists: {}", yes_no(info.exists)));
        if info.exists {
            lines.push(format!("  Readable: {}", yes_no(info.readable)));
            if info.readable {
                lines.push(format!("  Valid PEM: {}", yes_no(info.is_valid_pem)));
                if info.is_valid_pem {
                    lines.push(format!("  Certificate count: {}", info.cert_count));
                    if !info.subjects.is_empty() {
                        lines.push(format!(
                            "  Contains CAs: {}",
                            info.subjects[..info.subjects.len().min(5)].join(", ")
                        ));
                    }
                }
            }
        }
        if let Some(error) = &info.error {
            lines.push(format!("  Error: {error}"));
        }
        lines.push(String::new());
    }

    lines.push(format!("Connection Test ({}):", diag.test_host));
    lines.push(format!(
        "  OpenSSL available: {}",
        yes_no(diag.openssl_available)
    ));
    if diag.openssl_available {
        lines.push(format!(
            "  Connection: {}",
            if diag.connection_successful {
                "SUCCESS"
            } else {
                "FAILED"
            }
        ));
        if let Some(error) = &diag.connection_error {
            lines.push(format!("  Error: {error}"));
        }
    }
    lines.push(String::new());

    if !diag.issues.is_empty() {
        lines.push("Issues Found:".to_string());
        for issue in &diag.issues {
            lines.push(format!("  - {issue}"));
        }
        lines.push(String::new());
    }

    lines.push(RULE.to_string());
    lines.push("RECOMMENDATIONS".to_string());
    lines.push(RULE.to_string());
    lines.push(String::new());

    for (i, rec) in diag.recommendations.iter().enumerate() {
        lines.push(format!("{}. {rec}", i + 1));
        lines.push(String::new());
    }

    if diag.can_auto_fix && diag.system == "macos" {
        let export_path = default_bundle_path();
        lines.push("Quick Fix for macOS:".to_string());
        lines.push("  Run this command to export system certificates:".to_string());
        lines.push(String::new());
        lines.push(format!(
            "  security export -t certs -f pemseq \
             -k /Library/Keychains/System.keychain -o {}",
            export_path.display()
        ));
        lines.push(format!("  export {CERT_FILE_VAR}={}", export_path.display()));
        lines.push(String::new());
    }

    lines.push("Last Resort (NOT recommended for production):".to_string());
    lines.push(format!("  export {VERIFY_VAR}=false"));
    lines.push(String::new());

    lines.join("\n")
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "Yes"
    } else {
        "No"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::CertificateInfo;

    fn fixture_diag() -> SslDiagnostics {
        SslDiagnostics {
            ssl_cert_file: Some("/test/path.pem".to_string()),
            cert_file_info: Some(CertificateInfo {
                path: "/test/path.pem".to_string(),
                exists: true,
                readable: true,
                is_valid_pem: true,
                cert_count: 3,
                error: None,
                subjects: vec!["Corp Root CA".to_string()],
            }),
            openssl_available: true,
            connection_error: Some("verify error:num=19:self signed certificate".to_string()),
            system: "linux".to_string(),
            issues: vec!["Self-signed certificate in chain".to_string()],
            recommendations: vec!["Export the proxy CA".to_string()],
            ..SslDiagnostics::default()
        }
    }

    #[test]
    fn non_tls_errors_pass_through_unchanged() {
        assert_eq!(explain("Connection refused"), "Connection refused");
        assert_eq!(explain("disk full"), "disk full");
    }

    #[test]
    fn recognizes_tls_keywords() {
        for message in [
            "SSL: CERTIFICATE_VERIFY_FAILED",
            "certificate verify failed",
            "unable to get local issuer certificate",
            "self signed certificate in certificate chain",
            "SSL handshake failed",
            "error:0A000086:SSL routines: tlsv1 alert",
        ] {
            assert!(is_tls_error(message), "should detect: {message}");
        }
        assert!(!is_tls_error("Connection refused"));
        assert!(!is_tls_error("404 not found"));
    }

    #[test]
    fn report_has_header_and_last_resort_footer() {
        let report = render("certificate verify failed", &fixture_diag());
        assert!(report.starts_with("SSL Certificate Error: certificate verify failed"));
        assert!(report.contains("SSL DIAGNOSTICS"));
        assert!(report.contains("RECOMMENDATIONS"));
        assert!(report
            .trim_end()
            .ends_with("export CRUCIBLE_SSL_VERIFY=false"));
    }

    #[test]
    fn report_shows_environment_block() {
        let report = render("ssl error", &fixture_diag());
        assert!(report.contains("SSL_CERT_FILE:       /test/path.pem"));
        assert!(report.contains("REQUESTS_CA_BUNDLE:  (not set)"));
        assert!(report.contains("CRUCIBLE_SSL_VERIFY: (not set)"));
    }

    #[test]
    fn environment_values_start_in_the_same_column() {
        let report = render("ssl error", &fixture_diag());
        let columns: Vec<usize> = report
            .lines()
            .filter(|l| {
                l.contains("SSL_CERT_FILE:")
                    || l.contains("REQUESTS_CA_BUNDLE:")
                    || l.contains("CRUCIBLE_SSL_VERIFY:")
            })
            .filter_map(|l| l.find("/test/path.pem").or_else(|| l.find("(not set)")))
            .collect();
        assert_eq!(columns.len(), 3);
        assert!(columns.windows(2).all(|w| w[0] == w[1]), "{columns:?}");
    }

    #[test]
    fn report_shows_certificate_analysis_when_bundle_configured() {
        let report = render("ssl error", &fixture_diag());
        assert!(report.contains("Certificate File Analysis:"));
        assert!(report.contains("Certificate count: 3"));
        assert!(report.contains("Contains CAs: Corp Root CA"));
    }

    #[test]
    fn report_omits_certificate_analysis_without_bundle() {
        let diag = SslDiagnostics::default();
        let report = render("ssl error", &diag);
        assert!(!report.contains("Certificate File Analysis:"));
    }

    #[test]
    fn report_enumerates_issues_and_recommendations() {
        let report = render("ssl error", &fixture_diag());
        assert!(report.contains("  - Self-signed certificate in chain"));
        assert!(report.contains("1. Export the proxy CA"));
    }

    #[test]
    fn quick_fix_block_is_macos_only() {
        let mut diag = fixture_diag();
        diag.system = "macos".to_string();
        diag.can_auto_fix = true;
        let report = render("ssl error", &diag);
        assert!(report.contains("Quick Fix for macOS:"));

        let linux_report = render("ssl error", &fixture_diag());
        assert!(!linux_report.contains("Quick Fix for macOS:"));
    }

    #[test]
    fn connection_block_reports_failure() {
        let report = render("ssl error", &fixture_diag());
        assert!(report.contains("Connection Test (management.azure.com):"));
        assert!(report.contains("  Connection: FAILED"));
        assert!(report.contains("self signed certificate"));
    }
}
