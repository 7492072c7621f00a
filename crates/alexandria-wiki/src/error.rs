use alexandria_auth::AuthError;
use alexandria_content::ContentError;
use alexandria_crypto::CryptoError;
use alexandria_types::{TypeError, UserId};

/// Errors from wiki flows.
#[derive(Debug, thiserror::Error)]
pub enum WikiError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Path(#[from] TypeError),

    /// Setup runs only while no account exists.
    #[error("the wiki is already set up")]
    AlreadySetUp,

    #[error("invalid email or password")]
    InvalidCredentials,

    /// The current password given for a change did not verify.
    #[error("current password is incorrect")]
    IncorrectPassword,

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("new password must differ from the current one")]
    PasswordUnchanged,

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The acting user lacks the rights for the operation.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for wiki flows.
pub type WikiResult<T> = Result<T, WikiError>;
