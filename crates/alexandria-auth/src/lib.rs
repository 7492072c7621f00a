//! User accounts and login sessions for the Alexandria wiki.
//!
//! # Components
//!
//! - [`User`] — An account with its password record
//! - [`CredentialStore`] — All users, mirrored to a single file
//! - [`SessionRegistry`] — Live login sessions, never persisted
//!
//! # Design Rules
//!
//! 1. Emails are unique ignoring case; ids are unique and never zero.
//! 2. Callers get clones of users. Authentication always consults the stored
//!    record, never a caller's snapshot.
//! 3. Mutations stay in memory until [`CredentialStore::save`] is called.
//! 4. The credential file is replaced atomically and carries a format
//!    version so older files keep loading.

pub mod credentials;
pub mod error;
pub mod session;
pub mod user;

pub use credentials::{CredentialStore, FORMAT_VERSION};
pub use error::{AuthError, AuthResult};
pub use session::{
    Session, SessionRegistry, DEFAULT_TOKEN_LEN, SESSION_COOKIE_MAX_AGE, SESSION_COOKIE_NAME,
};
pub use user::User;
