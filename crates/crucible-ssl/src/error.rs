use thiserror::Error;

/// Result type alias for TLS configuration operations
pub type Result<T> = std::result::Result<T, SslError>;

/// Errors from TLS policy configuration.
///
/// Diagnostics entry points deliberately do not use this type: they
/// always return a populated report and fold failures into it. Only
/// the policy-to-client bridge can fail outright, because a broken
/// custom bundle must not silently downgrade to default trust.
#[derive(Error, Debug)]
pub enum SslError {
    /// Configured CA bundle could not be read
    #[error("cannot read CA bundle {path}: {source}")]
    BundleRead {
        /// Path that failed to read
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Configured CA bundle is not parseable PEM
    #[error("cannot parse CA bundle {path}: {reason}")]
    BundleParse {
        /// Path that failed to parse
        path: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Generic configuration error
    #[error("configuration error: {0}")]
    Config(String),
}
