use alexandria_crypto::CryptoError;
use alexandria_types::UserId;

/// Errors from account and session operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Another account already uses this email (compared ignoring case).
    #[error("email already in use: {0}")]
    DuplicateEmail(String),

    /// The randomly drawn id is already taken.
    #[error("user id collision: {0}")]
    IdCollision(UserId),

    #[error("user not found: {0}")]
    UserNotFound(UserId),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The credential file could not be decoded.
    #[error("failed to decode credential file: {0}")]
    Decode(String),

    #[error("failed to encode credential file: {0}")]
    Encode(String),

    /// The credential file was written by a newer format version.
    #[error("unsupported credential file version {0}")]
    UnsupportedVersion(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding a store lock.
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),
}

/// Result alias for account and session operations.
pub type AuthResult<T> = Result<T, AuthError>;
