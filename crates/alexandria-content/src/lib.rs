//! Article storage for the Alexandria wiki.
//!
//! Articles live in a plain directory tree: every category is a directory
//! and every article is a `<name>.md` file holding a TOML metadata block, a
//! `+++` delimiter, and a Markdown body. Nothing is cached; each read goes
//! to disk.
//!
//! # Components
//!
//! - [`codec`] -- parse/serialize the on-disk article format, render HTML
//! - [`Article`] / [`Category`] -- the resolved content model
//! - [`ContentStore`] -- the storage interface
//! - [`FsContentStore`] -- the filesystem backend
//!
//! # Consistency Rules
//!
//! 1. A path resolves to exactly one of article, category, or not found.
//! 2. A directory wins over an article with the same stem.
//! 3. Reads share one tree-wide lock; writes hold it exclusively, so no read
//!    observes a half-written file or a listing that disagrees with it.
//! 4. Only one store may own a given root (or any directory below it).
//! 5. All I/O errors are propagated, never silently ignored.

pub mod article;
pub mod codec;
pub mod error;
pub mod fs;
pub mod traits;

pub use article::{Article, Category, Resolved};
pub use codec::{CodecError, Metadata, ARTICLE_EXTENSION, DELIMITER};
pub use error::{ContentError, ContentResult};
pub use fs::FsContentStore;
pub use traits::ContentStore;
