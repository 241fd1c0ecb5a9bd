//! Full diagnostic runs: compose policy, bundle analysis, handshake
//! probing and chain inspection into one report.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bundle::{analyze_bundle, CertificateInfo};
use crate::chain::certificate_chain;
use crate::env::{SslEnv, CA_BUNDLE_VAR, CERT_FILE_VAR};
use crate::exec::{CommandRunner, SystemRunner};
use crate::export::{default_bundle_path, keychain_export_command};
use crate::probe::{probe_handshake, DEFAULT_PORT};

/// Default probe target: the Azure management endpoint most corporate
/// deployments need to reach.
pub const DEFAULT_TEST_HOST: &str = "management.azure.com";

/// Well-known system CA bundle locations, checked in order.
const LINUX_CA_PATHS: &[&str] = &[
    // Debian/Ubuntu
    "/etc/ssl/certs/ca-certificates.crt",
    // RHEL/CentOS
    "/etc/pki/tls/certs/ca-bundle.crt",
    // OpenSUSE
    "/etc/ssl/ca-bundle.pem",
    // Fedora
    "/etc/pki/ca-trust/extracted/pem/tls-ca-bundle.pem",
];

/// Aggregate report of one diagnostic run.
///
/// Environment values are captured at call time, not live. Issues and
/// recommendations are appended in detection order; earlier entries
/// are higher priority for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SslDiagnostics {
    /// `SSL_CERT_FILE` as observed
    pub ssl_cert_file: Option<String>,
    /// `REQUESTS_CA_BUNDLE` as observed
    pub requests_ca_bundle: Option<String>,
    /// `CRUCIBLE_SSL_VERIFY` as observed
    pub crucible_ssl_verify: Option<String>,

    /// Analysis of the resolved bundle, if one was configured
    pub cert_file_info: Option<CertificateInfo>,

    /// Host the handshake probe targeted
    pub test_host: String,
    /// Whether the probe verified successfully
    pub connection_successful: bool,
    /// Failure reason from the probe, if any
    pub connection_error: Option<String>,
    /// Whether the openssl CLI was found
    pub openssl_available: bool,
    /// Raw probe output or failure reason
    pub openssl_output: Option<String>,

    /// Platform name (`macos`, `linux`, `windows`, …)
    pub system: String,
    /// macOS `security` tool present
    pub has_security_tool: bool,

    /// Problems found, in detection order
    pub issues: Vec<String>,
    /// Remediation guidance, in priority order
    pub recommendations: Vec<String>,
    /// A one-shot remediation command is available
    pub can_auto_fix: bool,
    /// The one-shot remediation command, when available
    pub auto_fix_command: Option<String>,
}

impl Default for SslDiagnostics {
    fn default() -> Self {
        Self {
            ssl_cert_file: None,
            requests_ca_bundle: None,
            crucible_ssl_verify: None,
            cert_file_info: None,
            test_host: DEFAULT_TEST_HOST.to_string(),
            connection_successful: false,
            connection_error: None,
            openssl_available: false,
            openssl_output: None,
            system: String::new(),
            has_security_tool: false,
            issues: Vec::new(),
            recommendations: Vec::new(),
            can_auto_fix: false,
            auto_fix_command: None,
        }
    }
}

/// Run full diagnostics against the default host.
#[must_use]
pub fn diagnose() -> SslDiagnostics {
    diagnose_host(DEFAULT_TEST_HOST)
}

/// Run full diagnostics against `host`.
///
/// Never fails: tool and filesystem problems degrade into issues and
/// recommendations in the report.
#[must_use]
pub fn diagnose_host(host: &str) -> SslDiagnostics {
    diagnose_with(
        &SystemRunner,
        &SslEnv::capture(),
        std::env::consts::OS,
        host,
    )
}

/// [`diagnose_host`] with injected runner, environment and platform.
pub fn diagnose_with(
    runner: &dyn CommandRunner,
    env: &SslEnv,
    os: &str,
    host: &str,
) -> SslDiagnostics {
    let mut diag = SslDiagnostics {
        ssl_cert_file: env.cert_file.clone(),
        requests_ca_bundle: env.ca_bundle.clone(),
        crucible_ssl_verify: env.verify.clone(),
        test_host: host.to_string(),
        system: os.to_string(),
        openssl_available: runner.available("openssl"),
        has_security_tool: os == "macos" && runner.available("security"),
        ..SslDiagnostics::default()
    };

    let ca_file = env.configured_bundle().map(str::to_owned);

    check_bundle(runner, &mut diag, ca_file.as_deref());
    if diag.openssl_available {
        check_connection(runner, &mut diag, host, ca_file.as_deref());
    } else {
        diag.issues.push(
            "openssl command not available - cannot perform detailed diagnostics".to_string(),
        );
        diag.recommendations
            .push("Install openssl for better SSL troubleshooting".to_string());
    }
    add_platform_guidance(&mut diag, ca_file.as_deref());

    if diag.recommendations.is_empty() {
        if env.verify_disabled() {
            diag.recommendations.push(
                "SSL verification is currently disabled. \
                 This works but is insecure for production use."
                    .to_string(),
            );
        } else {
            diag.recommendations.push(
                "Contact your IT department for the corporate CA certificate bundle".to_string(),
            );
        }
    }

    diag
}

/// Analyze the configured bundle, or note that none is configured.
fn check_bundle(runner: &dyn CommandRunner, diag: &mut SslDiagnostics, ca_file: Option<&str>) {
    let Some(ca_file) = ca_file else {
        diag.issues.push(format!(
            "No custom CA bundle configured ({CERT_FILE_VAR} or {CA_BUNDLE_VAR})"
        ));
        return;
    };

    let info = analyze_bundle(runner, Path::new(ca_file));

    if !info.exists {
        diag.issues
            .push(format!("Certificate file does not exist: {ca_file}"));
        diag.recommendations
            .push(format!("Create or update the certificate file at: {ca_file}"));
    } else if !info.readable {
        diag.issues
            .push(format!("Cannot read certificate file: {ca_file}"));
        diag.recommendations
            .push(format!("Check permissions on: {ca_file}"));
    } else if !info.is_valid_pem {
        diag.issues.push(format!(
            "Invalid certificate format: {}",
            info.error.as_deref().unwrap_or("unknown error")
        ));
        diag.recommendations
            .push("Ensure the file contains valid PEM-formatted certificates".to_string());
    } else if info.cert_count == 0 {
        diag.issues.push("Certificate bundle is empty".to_string());
    }

    diag.cert_file_info = Some(info);
}

/// Probe the handshake and classify any failure against known causes.
fn check_connection(
    runner: &dyn CommandRunner,
    diag: &mut SslDiagnostics,
    host: &str,
    ca_file: Option<&str>,
) {
    let bundle = ca_file.map(Path::new);
    let (success, output) = probe_handshake(runner, host, DEFAULT_PORT, bundle);
    diag.connection_successful = success;
    diag.openssl_output = Some(output.clone());

    if success {
        return;
    }
    diag.connection_error = Some(output.clone());

    // First matching cause wins; compound failures are classified by
    // this fixed priority order.
    let lowered = output.to_lowercase();
    if lowered.contains("unable to get local issuer certificate") {
        diag.issues
            .push("Missing intermediate or root CA certificate in chain".to_string());
        let chain = certificate_chain(runner, host, DEFAULT_PORT);
        if !chain.is_empty() {
            diag.recommendations.push(format!(
                "The server's certificate chain requires these CAs: {}",
                chain[..chain.len().min(4)].join(", ")
            ));
        }
    } else if lowered.contains("self signed certificate in certificate chain") {
        diag.issues
            .push("Self-signed certificate in chain (common with corporate proxies)".to_string());
        diag.recommendations.push(
            "Your corporate proxy likely uses a self-signed CA. \
             Export it from your system keychain."
                .to_string(),
        );
    } else if lowered.contains("certificate has expired") {
        diag.issues
            .push("A certificate in the chain has expired".to_string());
        diag.recommendations
            .push("Contact your IT department - a certificate needs renewal".to_string());
    } else if lowered.contains("unable to verify the first certificate") {
        diag.issues
            .push("Cannot verify the server's certificate".to_string());
        if let Some(ca_file) = ca_file {
            diag.recommendations.push(format!(
                "The CA bundle at {ca_file} may not contain the required root CA"
            ));
        }
    }

    // Re-probe with system trust to tell a broken bundle apart from a
    // broken host.
    if ca_file.is_some() {
        let (default_success, _) = probe_handshake(runner, host, DEFAULT_PORT, None);
        if default_success {
            diag.issues.push(
                "Connection works with system CAs but fails with your custom CA bundle"
                    .to_string(),
            );
            diag.recommendations.push(
                "Your custom CA bundle may be incomplete. Try combining it with system CAs."
                    .to_string(),
            );
        }
    }
}

fn add_platform_guidance(diag: &mut SslDiagnostics, ca_file: Option<&str>) {
    if diag.system == "macos" && diag.has_security_tool {
        let export_path = default_bundle_path();
        diag.auto_fix_command = Some(keychain_export_command(&export_path));
        diag.can_auto_fix = true;
        if !diag.connection_successful {
            let path = export_path.display();
            diag.recommendations.push(format!(
                "On macOS, export your system certificates:\n\
                 \x20  security export -t certs -f pemseq -k /Library/Keychains/System.keychain -o {path}\n\
                 \x20  export {CERT_FILE_VAR}={path}"
            ));
        }
    } else if diag.system == "linux" {
        if let Some(path) = LINUX_CA_PATHS.iter().find(|p| Path::new(p).exists()) {
            if ca_file.is_none() {
                diag.recommendations.push(format!(
                    "Try using your system CA bundle:\n   export {CERT_FILE_VAR}={path}"
                ));
            }
        }
    }
}
