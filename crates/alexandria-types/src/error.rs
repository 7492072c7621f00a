use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid content path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid user id: {0}")]
    InvalidUserId(String),
}
