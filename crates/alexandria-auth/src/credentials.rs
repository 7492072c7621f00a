//! The credential store: every account, mirrored to one file.
//!
//! The in-memory user list sits behind a `RwLock`. Lookups share it, and
//! password checks only hold it long enough to copy the account out. Anything
//! that mutates the list or checks a uniqueness rule takes it exclusively. [`CredentialStore::save`] also holds the
//! exclusive lock while it replaces the file, so an "add then save"
//! sequence never persists another thread's half-applied change.
//!
//! # File Format
//!
//! A single bincode blob `{ version: u32, users: [User] }`.
//!
//! - Version 1 (current): users carry the admin flag and the hash
//!   parameters of their password.
//! - Version 0: users without either. Loaded with [`HashParams::LEGACY`]
//!   and rewritten as version 1 on the next save.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use alexandria_crypto::{random_int, HashParams, PasswordHasher, PasswordRecord, SALT_LEN};
use alexandria_types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::user::User;

/// Format version written by [`CredentialStore::save`].
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct StoredFile<'a> {
    version: u32,
    users: &'a [User],
}

#[derive(Deserialize)]
struct LoadedFile<U> {
    #[allow(dead_code)]
    version: u32,
    users: Vec<U>,
}

/// A user as stored by format version 0.
#[derive(Serialize, Deserialize)]
struct LegacyUser {
    id: UserId,
    email: String,
    display_name: String,
    created_at: Timestamp,
    digest: String,
    salt: String,
}

impl From<LegacyUser> for User {
    fn from(legacy: LegacyUser) -> Self {
        User {
            id: legacy.id,
            admin: false,
            email: legacy.email,
            display_name: legacy.display_name,
            created_at: legacy.created_at,
            password: PasswordRecord {
                digest: legacy.digest,
                salt: legacy.salt,
                params: HashParams::LEGACY,
            },
        }
    }
}

/// File-backed store of all user accounts.
///
/// Only one store may own a given file.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    hasher: PasswordHasher,
    /// Verified against when no account matches a login, so unknown emails
    /// cost the same as wrong passwords. Never matches any password.
    decoy: PasswordRecord,
    users: RwLock<Vec<User>>,
}

impl CredentialStore {
    /// Open the store at `path`.
    ///
    /// A missing file yields an empty store; nothing is written until
    /// [`save`](Self::save). A file that cannot be decoded is an error.
    pub fn load(path: impl Into<PathBuf>, hasher: PasswordHasher) -> AuthResult<Self> {
        let path = path.into();
        let users = match fs::read(&path) {
            Ok(bytes) => decode(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no credential file, starting empty");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), users = users.len(), "loaded credential store");

        let decoy = PasswordRecord {
            digest: String::new(),
            salt: "0".repeat(SALT_LEN),
            params: *hasher.params(),
        };
        Ok(Self {
            path,
            hasher,
            decoy,
            users: RwLock::new(users),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The hasher new passwords are derived with.
    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    fn read_guard(&self) -> AuthResult<RwLockReadGuard<'_, Vec<User>>> {
        self.users
            .read()
            .map_err(|_| AuthError::LockPoisoned("credential store"))
    }

    fn write_guard(&self) -> AuthResult<RwLockWriteGuard<'_, Vec<User>>> {
        self.users
            .write()
            .map_err(|_| AuthError::LockPoisoned("credential store"))
    }

    /// Build an unsaved user with a freshly hashed password.
    ///
    /// The id stays unassigned until [`add_user`](Self::add_user).
    pub fn new_user(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
        admin: bool,
    ) -> AuthResult<User> {
        Ok(User {
            id: UserId::unassigned(),
            admin,
            email: email.to_string(),
            display_name: display_name.to_string(),
            created_at: Timestamp::now(),
            password: self.hasher.derive(password)?,
        })
    }

    /// Assign a random id and append the user. Does not persist.
    pub fn add_user(&self, mut user: User) -> AuthResult<User> {
        let mut users = self.write_guard()?;

        if users.iter().any(|u| u.has_email(&user.email)) {
            return Err(AuthError::DuplicateEmail(user.email));
        }

        // Zero is reserved for unassigned ids.
        let id = UserId::new(random_int(u64::from(u32::MAX))? as u32 + 1);
        if users.iter().any(|u| u.id == id) {
            warn!(id = %id, "drew an id that is already taken");
            return Err(AuthError::IdCollision(id));
        }

        user.id = id;
        users.push(user.clone());
        info!(id = %id, admin = user.admin, "added user");
        Ok(user)
    }

    /// Remove the user with `id`. Returns `false` if there was none.
    pub fn delete_user(&self, id: UserId) -> AuthResult<bool> {
        let mut users = self.write_guard()?;
        match users.iter().position(|u| u.id == id) {
            Some(idx) => {
                users.remove(idx);
                info!(id = %id, "deleted user");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The user with this email, if `password` is theirs.
    ///
    /// Hashing runs after the lock is released.
    pub fn check_login(&self, email: &str, password: &str) -> AuthResult<Option<User>> {
        let found = self.read_guard()?.iter().find(|u| u.has_email(email)).cloned();
        match found {
            Some(user) => Ok(self.verified(user, password)),
            None => {
                self.hasher.verify(password, &self.decoy);
                Ok(None)
            }
        }
    }

    /// Re-check `password` for `user` against the stored record.
    ///
    /// A snapshot taken before a password change cannot be used to
    /// authenticate with the old password.
    pub fn check_password(&self, user: Option<&User>, password: &str) -> AuthResult<Option<User>> {
        let Some(user) = user else {
            return Ok(None);
        };
        let stored = self.read_guard()?.iter().find(|u| u.id == user.id).cloned();
        Ok(stored.and_then(|stored| self.verified(stored, password)))
    }

    fn verified(&self, user: User, password: &str) -> Option<User> {
        if self.hasher.verify(password, &user.password) {
            Some(user)
        } else {
            debug!(id = %user.id, "password rejected");
            None
        }
    }

    /// Replace a user's password, hashed with the current defaults.
    pub fn set_password(&self, id: UserId, password: &str) -> AuthResult<()> {
        let record = self.hasher.derive(password)?;
        let mut users = self.write_guard()?;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AuthError::UserNotFound(id))?;
        user.password = record;
        info!(id = %id, "changed password");
        Ok(())
    }

    /// Change a user's email and display name.
    pub fn update_profile(&self, id: UserId, email: &str, display_name: &str) -> AuthResult<User> {
        let mut users = self.write_guard()?;
        if users.iter().any(|u| u.id != id && u.has_email(email)) {
            return Err(AuthError::DuplicateEmail(email.to_string()));
        }
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AuthError::UserNotFound(id))?;
        user.email = email.to_string();
        user.display_name = display_name.to_string();
        debug!(id = %id, "updated profile");
        Ok(user.clone())
    }

    /// Grant or revoke administrator rights.
    pub fn set_admin(&self, id: UserId, admin: bool) -> AuthResult<()> {
        let mut users = self.write_guard()?;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AuthError::UserNotFound(id))?;
        user.admin = admin;
        info!(id = %id, admin, "changed admin flag");
        Ok(())
    }

    pub fn user(&self, id: UserId) -> AuthResult<Option<User>> {
        Ok(self.read_guard()?.iter().find(|u| u.id == id).cloned())
    }

    pub fn user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(self.read_guard()?.iter().find(|u| u.has_email(email)).cloned())
    }

    /// Snapshot of every user in insertion order.
    pub fn users(&self) -> AuthResult<Vec<User>> {
        Ok(self.read_guard()?.clone())
    }

    pub fn len(&self) -> AuthResult<usize> {
        Ok(self.read_guard()?.len())
    }

    /// `true` until the first account exists.
    pub fn is_empty(&self) -> AuthResult<bool> {
        Ok(self.read_guard()?.is_empty())
    }

    /// Write every user to the backing file.
    ///
    /// The file is written to a temporary sibling and renamed over the
    /// target, so a crash leaves either the old or the new contents.
    pub fn save(&self) -> AuthResult<()> {
        let users = self.write_guard()?;
        let bytes = bincode::serialize(&StoredFile {
            version: FORMAT_VERSION,
            users: users.as_slice(),
        })
        .map_err(|e| AuthError::Encode(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(
            path = %self.path.display(),
            users = users.len(),
            bytes = bytes.len(),
            "saved credential store"
        );
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> AuthResult<Vec<User>> {
    let version: u32 =
        bincode::deserialize(bytes).map_err(|e| AuthError::Decode(e.to_string()))?;
    match version {
        FORMAT_VERSION => {
            let file: LoadedFile<User> =
                bincode::deserialize(bytes).map_err(|e| AuthError::Decode(e.to_string()))?;
            Ok(file.users)
        }
        0 => {
            let file: LoadedFile<LegacyUser> =
                bincode::deserialize(bytes).map_err(|e| AuthError::Decode(e.to_string()))?;
            warn!(
                users = file.users.len(),
                "upgrading version 0 credential file; admin flags must be re-granted"
            );
            Ok(file.users.into_iter().map(User::from).collect())
        }
        other => Err(AuthError::UnsupportedVersion(other)),
    }
}
