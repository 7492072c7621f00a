//! Foundation types for the Alexandria wiki.
//!
//! Every other Alexandria crate depends on `alexandria-types`.
//!
//! # Key Types
//!
//! - [`UserId`] — Numeric account identifier, unique within a credential store
//! - [`Timestamp`] — Whole seconds since the UNIX epoch
//! - [`ContentPath`] — Normalized, root-relative path into the article namespace

pub mod error;
pub mod identity;
pub mod path;
pub mod temporal;

pub use error::TypeError;
pub use identity::UserId;
pub use path::ContentPath;
pub use temporal::Timestamp;
