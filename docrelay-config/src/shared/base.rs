use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A chunk size used to bound concurrency is zero.
    #[error("`{0}` cannot be zero")]
    ChunkSizeZero(&'static str),
    /// A required string field is empty.
    #[error("`{0}` cannot be empty")]
    EmptyField(&'static str),
    /// The cache error sample rate is outside of `0.0..=1.0`.
    #[error("`error_sample_rate` must be between 0.0 and 1.0, got {0}")]
    InvalidSampleRate(String),
    /// The cache ttl is zero.
    #[error("`ttl_secs` cannot be zero")]
    CacheTtlZero,
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
}
