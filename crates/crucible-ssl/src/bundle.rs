//! CA bundle analysis: structural PEM validation plus best-effort
//! subject extraction through the openssl CLI.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::exec::CommandRunner;

const BEGIN_MARKER: &str = "-----BEGIN CERTIFICATE-----";
const END_MARKER: &str = "-----END CERTIFICATE-----";

/// Per-call timeout for each subject-extraction subprocess.
const SUBJECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Keep subject lists at a size fit for terminal display.
const MAX_SUBJECTS: usize = 16;

/// Analysis of one candidate CA bundle file.
///
/// `exists`, `readable` and `is_valid_pem` gate each other in order;
/// the first failed step records `error` and stops the analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateInfo {
    /// Filesystem location inspected
    pub path: String,
    /// The file exists
    pub exists: bool,
    /// The file could be read
    pub readable: bool,
    /// BEGIN/END certificate markers are present and balanced
    pub is_valid_pem: bool,
    /// Number of certificate blocks found
    pub cert_count: usize,
    /// Diagnostic for the first failed validation step
    pub error: Option<String>,
    /// Extracted certificate common names, best-effort
    pub subjects: Vec<String>,
}

impl CertificateInfo {
    fn new(path: &Path) -> Self {
        Self {
            path: path.display().to_string(),
            exists: false,
            readable: false,
            is_valid_pem: false,
            cert_count: 0,
            error: None,
            subjects: Vec::new(),
        }
    }
}

/// Analyze a certificate bundle file.
///
/// Never fails: every problem is recorded in the returned
/// [`CertificateInfo::error`] field.
pub fn analyze_bundle(runner: &dyn CommandRunner, path: &Path) -> CertificateInfo {
    let mut info = CertificateInfo::new(path);

    if !path.exists() {
        info.error = Some(format!("File does not exist: {}", info.path));
        return info;
    }
    info.exists = true;

    let content = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            info.error = Some(format!("Permission denied reading: {}", info.path));
            return info;
        }
        Err(e) => {
            info.error = Some(format!("Cannot read file: {e}"));
            return info;
        }
    };
    info.readable = true;

    // Encoding noise must not fail the analysis.
    let text = String::from_utf8_lossy(&content);

    let begin_count = text.matches(BEGIN_MARKER).count();
    let end_count = text.matches(END_MARKER).count();

    if begin_count == 0 {
        info.error = Some("File does not contain any PEM certificates".to_string());
        return info;
    }
    if begin_count != end_count {
        info.error = Some(format!(
            "Malformed PEM: {begin_count} BEGIN markers but {end_count} END markers"
        ));
        return info;
    }

    info.is_valid_pem = true;
    info.cert_count = begin_count;

    info.subjects = extract_subjects(runner, path);
    info.subjects.truncate(MAX_SUBJECTS);

    info
}

/// Pull certificate common names out of a bundle via the openssl CLI.
///
/// The bundle is converted to a PKCS#7 container, dumped as text, and
/// scanned for `Subject:` lines. Any failure along the way yields an
/// empty list; subjects are decoration, not validation.
fn extract_subjects(runner: &dyn CommandRunner, path: &Path) -> Vec<String> {
    if !runner.available("openssl") {
        return Vec::new();
    }

    let path_str = path.display().to_string();
    let pkcs7 = match runner.run(
        "openssl",
        &["crl2pkcs7", "-nocrl", "-certfile", &path_str],
        "",
        SUBJECT_TIMEOUT,
    ) {
        Ok(out) if out.success() => out,
        Ok(out) => {
            debug!(path = %path_str, status = ?out.status, "crl2pkcs7 failed");
            return Vec::new();
        }
        Err(e) => {
            debug!(path = %path_str, error = %e, "crl2pkcs7 unavailable");
            return Vec::new();
        }
    };

    let dump = match runner.run(
        "openssl",
        &["pkcs7", "-print_certs", "-noout", "-text"],
        &pkcs7.stdout,
        SUBJECT_TIMEOUT,
    ) {
        Ok(out) if out.success() => out,
        Ok(_) | Err(_) => return Vec::new(),
    };

    parse_subjects(&dump.stdout)
}

fn parse_subjects(text: &str) -> Vec<String> {
    let mut subjects = Vec::new();
    for line in text.lines() {
        let Some((_, subject)) = line.split_once("Subject:") else {
            continue;
        };
        if let Some(cn) = common_name(subject.trim()) {
            subjects.push(cn);
        }
    }
    subjects
}

/// Extract the CN component from a one-line distinguished name.
/// Handles both `CN = x` and `CN=x` renderings.
fn common_name(subject: &str) -> Option<String> {
    let tail = subject
        .rsplit_once("CN = ")
        .or_else(|| subject.rsplit_once("CN="))
        .map(|(_, tail)| tail)?;
    let cn = tail.split(',').next().unwrap_or(tail).trim();
    (!cn.is_empty()).then(|| cn.to_string())
}
