use alexandria_types::ContentPath;

use crate::codec::CodecError;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// Neither a category nor an article exists at the path.
    #[error("not found: {0}")]
    NotFound(ContentPath),

    /// The article file exists but its metadata block is absent or
    /// undecodable.
    #[error("malformed article {path}: {source}")]
    MalformedArticle {
        path: ContentPath,
        #[source]
        source: CodecError,
    },

    /// The path cannot hold the requested kind of entry.
    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: ContentPath, reason: String },

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A thread panicked while holding the tree lock.
    #[error("content lock poisoned")]
    LockPoisoned,
}

/// Result alias for content store operations.
pub type ContentResult<T> = Result<T, ContentError>;
