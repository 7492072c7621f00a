//! In-memory login sessions.
//!
//! Sessions live only as long as the process. A session refers to its user
//! by id; it does not keep the user alive or track later changes to it.

use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use alexandria_crypto::{constant_time_eq, random_string};
use alexandria_types::{Timestamp, UserId};
use tracing::debug;

use crate::error::{AuthError, AuthResult};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "AlexandriaUserSession";

/// Lifetime of the session cookie.
pub const SESSION_COOKIE_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Token length used by [`SessionRegistry::new`].
pub const DEFAULT_TOKEN_LEN: usize = 32;

/// A logged-in user's session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub created_at: Timestamp,
    pub user_id: UserId,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// All live sessions.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<Vec<Session>>,
    token_len: usize,
    spawned_at: Timestamp,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_token_len(DEFAULT_TOKEN_LEN)
    }

    /// A registry issuing tokens of `token_len` characters.
    pub fn with_token_len(token_len: usize) -> Self {
        Self {
            sessions: RwLock::new(Vec::new()),
            token_len,
            spawned_at: Timestamp::now(),
        }
    }

    /// When the registry was created.
    pub fn spawned_at(&self) -> Timestamp {
        self.spawned_at
    }

    fn read_guard(&self) -> AuthResult<RwLockReadGuard<'_, Vec<Session>>> {
        self.sessions
            .read()
            .map_err(|_| AuthError::LockPoisoned("session registry"))
    }

    fn write_guard(&self) -> AuthResult<RwLockWriteGuard<'_, Vec<Session>>> {
        self.sessions
            .write()
            .map_err(|_| AuthError::LockPoisoned("session registry"))
    }

    /// Issue and register a fresh session for `user_id`.
    pub fn create(&self, user_id: UserId) -> AuthResult<Session> {
        let session = Session {
            token: random_string(self.token_len)?,
            created_at: Timestamp::now(),
            user_id,
        };
        self.add_session(session.clone())?;
        Ok(session)
    }

    pub fn add_session(&self, session: Session) -> AuthResult<()> {
        debug!(user = %session.user_id, "session opened");
        self.write_guard()?.push(session);
        Ok(())
    }

    /// Drop the session with `token`. Returns `false` if there was none.
    pub fn remove_session(&self, token: &str) -> AuthResult<bool> {
        let mut sessions = self.write_guard()?;
        let before = sessions.len();
        sessions.retain(|s| !constant_time_eq(s.token.as_bytes(), token.as_bytes()));
        Ok(sessions.len() != before)
    }

    /// Drop every session belonging to `user_id`. Returns how many went.
    pub fn remove_sessions_for_user(&self, user_id: UserId) -> AuthResult<usize> {
        let mut sessions = self.write_guard()?;
        let before = sessions.len();
        sessions.retain(|s| s.user_id != user_id);
        let removed = before - sessions.len();
        debug!(user = %user_id, removed, "sessions closed for user");
        Ok(removed)
    }

    /// Look up a session by token.
    pub fn get_session(&self, token: &str) -> AuthResult<Option<Session>> {
        if token.is_empty() {
            return Ok(None);
        }
        Ok(self
            .read_guard()?
            .iter()
            .find(|s| constant_time_eq(s.token.as_bytes(), token.as_bytes()))
            .cloned())
    }

    pub fn len(&self) -> AuthResult<usize> {
        Ok(self.read_guard()?.len())
    }

    pub fn is_empty(&self) -> AuthResult<bool> {
        Ok(self.read_guard()?.is_empty())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
