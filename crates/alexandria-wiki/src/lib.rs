//! The Alexandria wiki core.
//!
//! Ties the content store, the credential store and the session registry
//! together behind [`Wiki`], which exposes the flows a web layer needs:
//! first-run setup, login and logout, account management, and reading and
//! editing articles. Routing, templates and cookie transport live outside
//! this crate.
//!
//! # Key Types
//!
//! - [`WikiConfig`] — Paths and hashing parameters, from TOML and environment
//! - [`Wiki`] — The facade over all stores
//! - [`Page`] — A rendered article or a category listing

pub mod config;
pub mod error;
pub mod wiki;

pub use config::WikiConfig;
pub use error::{WikiError, WikiResult};
pub use wiki::{validate_email, Page, Wiki};
