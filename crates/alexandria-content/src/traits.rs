//! The [`ContentStore`] trait defining the article storage interface.

use alexandria_types::ContentPath;

use crate::article::{Article, Resolved};
use crate::error::ContentResult;

/// Storage backend for articles and categories.
///
/// Implementations must be thread-safe (`Send + Sync`). Every operation is
/// atomic with respect to every other operation on the same store.
pub trait ContentStore: Send + Sync {
    /// Resolve `path` to a category or an article.
    ///
    /// A category at the exact path wins over an article with the same stem.
    /// Fails with `NotFound` when neither exists.
    fn load(&self, path: &ContentPath) -> ContentResult<Resolved>;

    /// Create or replace the article at `article.path`, creating any missing
    /// categories on the way.
    fn write(&self, article: &Article) -> ContentResult<()>;

    /// Delete the article at `path`. Categories are left in place.
    fn remove(&self, path: &ContentPath) -> ContentResult<()>;

    /// Every article path in the tree, sorted.
    fn articles(&self) -> ContentResult<Vec<ContentPath>>;
}
