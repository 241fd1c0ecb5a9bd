//! TLS verification policy resolution.
//!
//! Policy comes from three environment sources, first match wins:
//! the explicit disable flag, the primary CA bundle variable, then
//! the fallback variable. Resolution is memoized per process since
//! the environment is assumed static during a run; callers that
//! mutate it mid-run must invalidate the cache.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::env::{SslEnv, VERIFY_VAR};
use crate::error::{Result, SslError};

/// How TLS certificate verification should be performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "bundle")]
pub enum VerifyPolicy {
    /// Verification is disabled. Insecure; testing escape hatch only.
    Disabled,
    /// Verify against the platform's default trust store.
    SystemTrust,
    /// Verify against a single custom CA bundle file.
    CustomBundle(PathBuf),
}

impl VerifyPolicy {
    /// Resolve the policy from an environment snapshot.
    ///
    /// Emits a `warn` event when verification is disabled, so the
    /// insecure override is always visible to the operator.
    #[must_use]
    pub fn from_env(env: &SslEnv) -> Self {
        if env.verify_disabled() {
            warn!(
                "SSL verification is disabled via {VERIFY_VAR}; \
                 this is insecure and should only be used for testing"
            );
            return Self::Disabled;
        }

        if let Some(bundle) = env.existing_bundle() {
            return Self::CustomBundle(PathBuf::from(bundle));
        }

        Self::SystemTrust
    }

    /// Whether this policy skips verification.
    #[must_use]
    pub const fn is_insecure(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

/// Memoized policy resolution with explicit invalidation.
///
/// Not a hidden singleton: tests and long-running processes can own
/// their own cache. A process-wide instance backs [`ssl_verify`].
#[derive(Debug, Default)]
pub struct PolicyCache {
    cached: Mutex<Option<VerifyPolicy>>,
}

impl PolicyCache {
    /// Create an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cached: Mutex::new(None),
        }
    }

    /// Resolve from the real environment, memoizing the first result.
    pub fn resolve(&self) -> VerifyPolicy {
        self.resolve_from(&SslEnv::capture())
    }

    /// Resolve from a given snapshot, memoizing the first result.
    pub fn resolve_from(&self, env: &SslEnv) -> VerifyPolicy {
        let mut cached = self.cached.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(policy) = cached.as_ref() {
            return policy.clone();
        }
        let policy = VerifyPolicy::from_env(env);
        *cached = Some(policy.clone());
        policy
    }

    /// Drop the memoized result so the next resolve re-reads the
    /// environment.
    pub fn invalidate(&self) {
        *self
            .cached
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}

static PROCESS_POLICY: PolicyCache = PolicyCache::new();

/// Resolve the process-wide verification policy.
///
/// The first successful resolution is sticky for the process
/// lifetime; see [`clear_ssl_verify_cache`].
#[must_use]
pub fn ssl_verify() -> VerifyPolicy {
    PROCESS_POLICY.resolve()
}

/// Forget the memoized process-wide policy.
pub fn clear_ssl_verify_cache() {
    PROCESS_POLICY.invalidate();
}

/// Apply a verification policy to a [`reqwest::ClientBuilder`].
///
/// `Disabled` turns verification off, `CustomBundle` installs the
/// bundle's certificates as additional roots, `SystemTrust` leaves
/// the builder on platform-default trust.
///
/// # Errors
///
/// Returns [`SslError`] when a custom bundle cannot be read or
/// parsed; a misconfigured bundle must surface, not silently fall
/// back to default trust.
pub fn apply_policy(
    builder: reqwest::ClientBuilder,
    policy: &VerifyPolicy,
) -> Result<reqwest::ClientBuilder> {
    match policy {
        VerifyPolicy::Disabled => Ok(builder.danger_accept_invalid_certs(true)),
        VerifyPolicy::SystemTrust => Ok(builder),
        VerifyPolicy::CustomBundle(path) => {
            let pem = std::fs::read(path).map_err(|source| SslError::BundleRead {
                path: path.display().to_string(),
                source,
            })?;
            let certs =
                reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| SslError::BundleParse {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            if certs.is_empty() {
                return Err(SslError::Config(format!(
                    "CA bundle {} contains no certificates",
                    path.display()
                )));
            }
            Ok(certs
                .into_iter()
                .fold(builder, reqwest::ClientBuilder::add_root_certificate))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::bundle::tests::SAMPLE_PEM_CERT;

    fn env(verify: Option<&str>, cert_file: Option<&str>, ca_bundle: Option<&str>) -> SslEnv {
        SslEnv {
            verify: verify.map(String::from),
            cert_file: cert_file.map(String::from),
            ca_bundle: ca_bundle.map(String::from),
        }
    }

    #[test]
    fn defaults_to_system_trust() {
        assert_eq!(
            VerifyPolicy::from_env(&SslEnv::default()),
            VerifyPolicy::SystemTrust
        );
    }

    #[test]
    fn disable_values_resolve_disabled() {
        for value in ["false", "0", "no", "off", "FALSE", "NO"] {
            let policy = VerifyPolicy::from_env(&env(Some(value), None, None));
            assert_eq!(policy, VerifyPolicy::Disabled, "value {value}");
            assert!(policy.is_insecure());
        }
    }

    #[test]
    fn disable_flag_beats_configured_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("ca.pem");
        std::fs::write(&bundle, SAMPLE_PEM_CERT).unwrap();

        let policy =
            VerifyPolicy::from_env(&env(Some("off"), Some(bundle.to_str().unwrap()), None));
        assert_eq!(policy, VerifyPolicy::Disabled);
    }

    #[test]
    fn existing_bundle_resolves_custom() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("ca.pem");
        std::fs::write(&bundle, SAMPLE_PEM_CERT).unwrap();

        let policy = VerifyPolicy::from_env(&env(None, Some(bundle.to_str().unwrap()), None));
        assert_eq!(policy, VerifyPolicy::CustomBundle(bundle));
    }

    #[test]
    fn nonexistent_bundle_falls_back_to_system_trust() {
        let policy =
            VerifyPolicy::from_env(&env(None, Some("/nonexistent/path/ca-bundle.crt"), None));
        assert_eq!(policy, VerifyPolicy::SystemTrust);
    }

    #[test]
    fn fallback_variable_used_when_primary_missing() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("ca.pem");
        std::fs::write(&bundle, SAMPLE_PEM_CERT).unwrap();

        let policy = VerifyPolicy::from_env(&env(
            None,
            Some("/nonexistent/ca.pem"),
            Some(bundle.to_str().unwrap()),
        ));
        assert_eq!(policy, VerifyPolicy::CustomBundle(bundle));
    }

    #[test]
    fn cache_is_sticky_until_invalidated() {
        let cache = PolicyCache::new();
        let first = cache.resolve_from(&env(Some("false"), None, None));
        assert_eq!(first, VerifyPolicy::Disabled);

        // Environment changed, cached result still returned.
        let second = cache.resolve_from(&SslEnv::default());
        assert_eq!(second, VerifyPolicy::Disabled);

        cache.invalidate();
        let third = cache.resolve_from(&SslEnv::default());
        assert_eq!(third, VerifyPolicy::SystemTrust);
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Capture {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn disabling_verification_emits_warning() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let policy = VerifyPolicy::from_env(&env(Some("false"), None, None));
            assert_eq!(policy, VerifyPolicy::Disabled);
        });

        let logged = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("SSL verification is disabled"));
    }

    #[test]
    fn apply_policy_rejects_unreadable_bundle() {
        let builder = reqwest::Client::builder();
        let policy = VerifyPolicy::CustomBundle(PathBuf::from("/nonexistent/ca.pem"));
        let err = apply_policy(builder, &policy).unwrap_err();
        assert!(matches!(err, SslError::BundleRead { .. }));
    }

    #[test]
    fn apply_policy_rejects_non_pem_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("garbage.pem");
        std::fs::write(&bundle, "not a certificate").unwrap();

        let builder = reqwest::Client::builder();
        let policy = VerifyPolicy::CustomBundle(bundle);
        let err = apply_policy(builder, &policy).unwrap_err();
        assert!(matches!(
            err,
            SslError::BundleParse { .. } | SslError::Config(_)
        ));
    }

    #[test]
    fn apply_policy_accepts_valid_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = dir.path().join("ca.pem");
        std::fs::write(&bundle, SAMPLE_PEM_CERT).unwrap();

        let builder = reqwest::Client::builder();
        let policy = VerifyPolicy::CustomBundle(bundle);
        assert!(apply_policy(builder, &policy).is_ok());
    }
}
