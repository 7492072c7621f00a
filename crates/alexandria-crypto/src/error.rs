/// Errors from cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The secure random generator failed or is unavailable.
    #[error("entropy source failure: {0}")]
    Entropy(String),

    /// A random range was requested with an upper bound of zero.
    #[error("invalid random bound: {0}")]
    InvalidBound(u64),

    /// Hash parameters were rejected by the key-derivation function.
    #[error("invalid hash parameters: {0}")]
    InvalidParams(String),

    /// The key-derivation function failed.
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Result alias for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
