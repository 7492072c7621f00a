//! Cryptographic primitives for the Alexandria wiki.
//!
//! Provides OS-backed random integers and alphanumeric strings (salts,
//! session tokens) and Argon2id password hashing with per-record parameter
//! snapshots, so that changing the configured defaults never invalidates
//! existing accounts.
//!
//! All crypto operations wrap established libraries; there is no custom
//! cryptography.

pub mod error;
pub mod password;
pub mod random;

pub use error::{CryptoError, CryptoResult};
pub use password::{constant_time_eq, HashParams, PasswordHasher, PasswordRecord, SALT_LEN};
pub use random::{random_int, random_string, ALPHANUMERIC};
