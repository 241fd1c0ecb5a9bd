//! # crucible-ssl
//!
//! SSL/TLS trust diagnostics for corporate networks.
//!
//! Corporate proxies, custom CA bundles and half-migrated trust
//! stores produce TLS failures that look identical from the outside.
//! This crate resolves the effective verification policy, validates
//! the configured CA bundle, runs a live handshake probe, and turns
//! the combination into issues and recommendations a user can act on.
//!
//! ## Pipeline
//!
//! ```text
//! Policy Resolver    -> Disabled | SystemTrust | CustomBundle(path)
//! Bundle Analyzer    -> CertificateInfo (PEM structure + subjects)
//! Handshake Prober   -> live `openssl s_client` verification test
//! Chain Inspector    -> chain the host actually presents
//! Orchestrator       -> SslDiagnostics { issues, recommendations }
//! ```
//!
//! Everything is synchronous and blocking, bounded by per-call
//! timeouts on external tools. Diagnostics entry points never fail:
//! tool and filesystem problems degrade into report entries.
//!
//! ## Typical use
//!
//! Call [`ssl_verify`] before building an HTTP client and feed the
//! policy through [`apply_policy`]. When a request dies with a
//! TLS-looking error, hand its text to [`explain`] and show the
//! result verbatim.

pub mod bundle;
pub mod chain;
pub mod diagnose;
pub mod env;
pub mod error;
pub mod exec;
pub mod export;
pub mod policy;
pub mod probe;
pub mod report;

pub use bundle::{analyze_bundle, CertificateInfo};
pub use chain::certificate_chain;
pub use diagnose::{diagnose, diagnose_host, diagnose_with, SslDiagnostics, DEFAULT_TEST_HOST};
pub use env::SslEnv;
pub use error::{Result, SslError};
pub use exec::{CommandOutput, CommandRunner, ExecError, SystemRunner};
pub use export::{default_bundle_path, export_keychain_certificates};
pub use policy::{
    apply_policy, clear_ssl_verify_cache, ssl_verify, PolicyCache, VerifyPolicy,
};
pub use probe::probe_handshake;
pub use report::{explain, is_tls_error};
