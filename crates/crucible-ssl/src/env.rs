//! Environment variables that drive TLS verification behavior.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Disable flag. Set to `false`/`0`/`no`/`off` (case-insensitive) to
/// skip certificate verification entirely.
pub const VERIFY_VAR: &str = "CRUCIBLE_SSL_VERIFY";

/// Primary CA bundle path variable.
pub const CERT_FILE_VAR: &str = "SSL_CERT_FILE";

/// Fallback CA bundle path variable, honored for compatibility with
/// tooling that already sets it.
pub const CA_BUNDLE_VAR: &str = "REQUESTS_CA_BUNDLE";

/// Values of [`VERIFY_VAR`] that disable verification.
pub const DISABLE_VALUES: &[&str] = &["false", "0", "no", "off"];

/// A point-in-time snapshot of the TLS-related environment.
///
/// Captured once per operation so diagnostics report the values
/// actually observed, and so tests can construct arbitrary
/// environments without mutating the process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SslEnv {
    /// Value of [`VERIFY_VAR`], if set.
    pub verify: Option<String>,
    /// Value of [`CERT_FILE_VAR`], if set.
    pub cert_file: Option<String>,
    /// Value of [`CA_BUNDLE_VAR`], if set.
    pub ca_bundle: Option<String>,
}

impl SslEnv {
    /// Snapshot the real process environment.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            verify: std::env::var(VERIFY_VAR).ok(),
            cert_file: std::env::var(CERT_FILE_VAR).ok(),
            ca_bundle: std::env::var(CA_BUNDLE_VAR).ok(),
        }
    }

    /// The configured CA bundle path, primary variable first.
    ///
    /// Does not check that the path exists; policy resolution does.
    #[must_use]
    pub fn configured_bundle(&self) -> Option<&str> {
        self.cert_file
            .as_deref()
            .filter(|v| !v.is_empty())
            .or(self.ca_bundle.as_deref().filter(|v| !v.is_empty()))
    }

    /// The configured CA bundle path, restricted to paths that exist.
    #[must_use]
    pub fn existing_bundle(&self) -> Option<&str> {
        [self.cert_file.as_deref(), self.ca_bundle.as_deref()]
            .into_iter()
            .flatten()
            .find(|p| !p.is_empty() && Path::new(p).exists())
    }

    /// Whether the disable flag is set to an accepted disable value.
    #[must_use]
    pub fn verify_disabled(&self) -> bool {
        self.verify
            .as_deref()
            .is_some_and(|v| DISABLE_VALUES.contains(&v.to_lowercase().as_str()))
    }
}
