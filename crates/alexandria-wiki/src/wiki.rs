//! The [`Wiki`] facade.
//!
//! Every flow validates its input, applies the change to the owning store,
//! and persists credential changes before returning. Acting users are always
//! re-read from the credential store, so a stale snapshot never grants
//! rights the account has since lost.

use std::sync::{Mutex, PoisonError};

use alexandria_auth::{CredentialStore, Session, SessionRegistry, User};
use alexandria_content::{Article, Category, ContentStore, FsContentStore, Resolved};
use alexandria_crypto::PasswordHasher;
use alexandria_types::{ContentPath, UserId};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::WikiConfig;
use crate::error::{WikiError, WikiResult};

/// What a path renders as.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Page {
    Article {
        article: Article,
        html: String,
        /// The category containing the article.
        category: Category,
    },
    Category(Category),
}

/// The wiki: content, accounts and sessions.
pub struct Wiki {
    config: WikiConfig,
    content: Box<dyn ContentStore>,
    credentials: CredentialStore,
    sessions: SessionRegistry,
    setup_lock: Mutex<()>,
}

impl Wiki {
    /// Open the stores named by `config`.
    pub fn open(config: WikiConfig) -> WikiResult<Self> {
        config.validate()?;
        let hasher = PasswordHasher::new(config.hash)?;
        let content = FsContentStore::open(config.content_path())?;
        let credentials = CredentialStore::load(config.user_storage_path(), hasher)?;
        let sessions = SessionRegistry::with_token_len(config.session_token_len);
        info!(
            content = %config.content_path().display(),
            users = %config.user_storage_path().display(),
            "opened wiki"
        );
        Ok(Self::with_stores(config, Box::new(content), credentials, sessions))
    }

    /// Assemble a wiki from already opened stores.
    pub fn with_stores(
        config: WikiConfig,
        content: Box<dyn ContentStore>,
        credentials: CredentialStore,
        sessions: SessionRegistry,
    ) -> Self {
        Self {
            config,
            content,
            credentials,
            sessions,
            setup_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &WikiConfig {
        &self.config
    }

    pub fn content(&self) -> &dyn ContentStore {
        self.content.as_ref()
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    // ---- Accounts ----

    /// `true` until the first account has been created.
    pub fn needs_setup(&self) -> WikiResult<bool> {
        Ok(self.credentials.is_empty()?)
    }

    /// Create the first account as an administrator and log it in.
    pub fn setup(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
        confirmation: &str,
    ) -> WikiResult<Session> {
        let _guard = self.setup_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.needs_setup()? {
            return Err(WikiError::AlreadySetUp);
        }
        if password != confirmation {
            return Err(WikiError::PasswordMismatch);
        }
        let user = self.provision_user(email, display_name, password, true)?;
        info!(id = %user.id, "initial administrator created");
        Ok(self.sessions.create(user.id)?)
    }

    /// Add and persist an account without checking who asked for it.
    ///
    /// Used by setup, by admins through [`create_user`](Self::create_user),
    /// and by local operator tooling.
    pub fn provision_user(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
        admin: bool,
    ) -> WikiResult<User> {
        let email = validate_email(email)?;
        let display_name = non_empty("display name", display_name.trim())?;
        non_empty("password", password)?;

        let user = self
            .credentials
            .new_user(&email, display_name, password, admin)?;
        let user = self.credentials.add_user(user)?;
        self.credentials.save()?;
        Ok(user)
    }

    /// Start a session for the account with these credentials.
    pub fn login(&self, email: &str, password: &str) -> WikiResult<Session> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(WikiError::InvalidCredentials);
        }
        let user = self
            .credentials
            .check_login(email, password)?
            .ok_or(WikiError::InvalidCredentials)?;
        debug!(id = %user.id, "login");
        Ok(self.sessions.create(user.id)?)
    }

    /// End the session with `token`. Returns `false` if it was not live.
    pub fn logout(&self, token: &str) -> WikiResult<bool> {
        Ok(self.sessions.remove_session(token)?)
    }

    /// Resolve a session token to its session and current user.
    ///
    /// Sessions whose user has been deleted are dropped.
    pub fn authenticate(&self, token: &str) -> WikiResult<Option<(Session, User)>> {
        let Some(session) = self.sessions.get_session(token)? else {
            return Ok(None);
        };
        match self.credentials.user(session.user_id)? {
            Some(user) => Ok(Some((session, user))),
            None => {
                self.sessions.remove_session(&session.token)?;
                Ok(None)
            }
        }
    }

    pub fn change_password(
        &self,
        user_id: UserId,
        old: &str,
        new: &str,
        confirmation: &str,
    ) -> WikiResult<()> {
        non_empty("current password", old)?;
        non_empty("new password", new)?;
        non_empty("password confirmation", confirmation)?;
        if new != confirmation {
            return Err(WikiError::PasswordMismatch);
        }
        if new == old {
            return Err(WikiError::PasswordUnchanged);
        }

        let user = self.require_user(user_id)?;
        if self.credentials.check_password(Some(&user), old)?.is_none() {
            return Err(WikiError::IncorrectPassword);
        }
        self.credentials.set_password(user_id, new)?;
        self.credentials.save()?;
        Ok(())
    }

    /// Set a new password without knowing the old one.
    pub fn reset_password(&self, user_id: UserId, new: &str) -> WikiResult<()> {
        non_empty("new password", new)?;
        self.require_user(user_id)?;
        self.credentials.set_password(user_id, new)?;
        self.credentials.save()?;
        Ok(())
    }

    pub fn update_profile(
        &self,
        user_id: UserId,
        email: &str,
        display_name: &str,
    ) -> WikiResult<User> {
        let email = validate_email(email)?;
        let display_name = non_empty("display name", display_name.trim())?;
        let user = self
            .credentials
            .update_profile(user_id, &email, display_name)?;
        self.credentials.save()?;
        Ok(user)
    }

    /// Create an account on behalf of an administrator.
    pub fn create_user(
        &self,
        actor: UserId,
        email: &str,
        display_name: &str,
        password: &str,
        admin: bool,
    ) -> WikiResult<User> {
        self.require_admin(actor)?;
        let user = self.provision_user(email, display_name, password, admin)?;
        info!(actor = %actor, id = %user.id, admin, "user created by administrator");
        Ok(user)
    }

    /// Delete the acting user's own account and end all of its sessions.
    pub fn delete_own_account(&self, actor: UserId) -> WikiResult<()> {
        self.delete_account(actor)?;
        info!(id = %actor, "account deleted by its owner");
        Ok(())
    }

    /// Delete another user's account. Administrators only.
    pub fn delete_user_as_admin(&self, actor: UserId, target: UserId) -> WikiResult<()> {
        self.require_admin(actor)?;
        if actor == target {
            return Err(WikiError::Forbidden(
                "administrators delete their own account as themselves",
            ));
        }
        self.delete_account(target)?;
        info!(actor = %actor, id = %target, "account deleted by administrator");
        Ok(())
    }

    /// Delete an account and end its sessions without checking who asked
    /// for it. Local operator tooling only.
    pub fn delete_account(&self, id: UserId) -> WikiResult<()> {
        if !self.credentials.delete_user(id)? {
            return Err(WikiError::UserNotFound(id));
        }
        self.credentials.save()?;
        self.sessions.remove_sessions_for_user(id)?;
        Ok(())
    }

    fn require_user(&self, id: UserId) -> WikiResult<User> {
        self.credentials
            .user(id)?
            .ok_or(WikiError::UserNotFound(id))
    }

    fn require_admin(&self, id: UserId) -> WikiResult<User> {
        let user = self.require_user(id)?;
        if !user.admin {
            return Err(WikiError::Forbidden("administrator rights required"));
        }
        Ok(user)
    }

    // ---- Articles ----

    /// Store `content` at `path`, titled after the last path segment.
    ///
    /// Carriage returns are stripped and surrounding whitespace trimmed.
    pub fn save_article(&self, path: &str, content: &str) -> WikiResult<Article> {
        let path = ContentPath::parse(path)?;
        let body = content.replace('\r', "");
        let title = path.name().to_string();
        let article = Article::new(path, title, body.trim());
        self.content.write(&article)?;
        Ok(article)
    }

    pub fn view(&self, path: &str) -> WikiResult<Page> {
        let path = ContentPath::parse(path)?;
        Ok(match self.content.load(&path)? {
            Resolved::Article { article, category } => Page::Article {
                html: article.to_html(),
                article,
                category,
            },
            Resolved::Category(category) => Page::Category(category),
        })
    }

    /// The root category.
    pub fn index(&self) -> WikiResult<Category> {
        Ok(self.content.load(&ContentPath::root())?.category().clone())
    }

    pub fn delete_article(&self, path: &str) -> WikiResult<()> {
        let path = ContentPath::parse(path)?;
        self.content.remove(&path)?;
        Ok(())
    }

    /// Every article path, sorted.
    pub fn articles(&self) -> WikiResult<Vec<ContentPath>> {
        Ok(self.content.articles()?)
    }
}

/// Trim and sanity-check an email address.
///
/// Accepts a bare `local@domain` address, or the address inside
/// `Display Name <local@domain>`.
pub fn validate_email(raw: &str) -> WikiResult<String> {
    let trimmed = raw.trim();
    let address = match (trimmed.rfind('<'), trimmed.strip_suffix('>')) {
        (Some(open), Some(inner)) => &inner[open + 1..],
        _ => trimmed,
    };

    let invalid = || WikiError::InvalidEmail(raw.to_string());
    let (local, domain) = address.rsplit_once('@').ok_or_else(invalid)?;
    let malformed = local.is_empty()
        || domain.is_empty()
        || local.contains('@')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || domain.contains("..")
        || address
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>'));
    if malformed {
        return Err(invalid());
    }
    Ok(address.to_string())
}

fn non_empty<'a>(field: &'static str, value: &'a str) -> WikiResult<&'a str> {
    if value.is_empty() {
        Err(WikiError::EmptyField(field))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alexandria_auth::AuthError;
    use alexandria_content::ContentError;
    use alexandria_crypto::HashParams;

    fn wiki() -> (tempfile::TempDir, Wiki) {
        let dir = tempfile::tempdir().unwrap();
        let config = WikiConfig {
            hash: HashParams {
                memory_kib: 64,
                ..HashParams::MINIMUM
            },
            ..WikiConfig::with_data_path(dir.path())
        };
        let wiki = Wiki::open(config).unwrap();
        (dir, wiki)
    }

    fn admin_and_user(wiki: &Wiki) -> (User, User) {
        wiki.setup("admin@example.com", "Admin", "pw", "pw").unwrap();
        let admin = wiki
            .credentials()
            .user_by_email("admin@example.com")
            .unwrap()
            .unwrap();
        let user = wiki
            .create_user(admin.id, "user@example.com", "User", "pw", false)
            .unwrap();
        (admin, user)
    }

    // ---- Setup and login ----

    #[test]
    fn setup_creates_logged_in_admin_once() {
        let (dir, wiki) = wiki();
        assert!(wiki.needs_setup().unwrap());

        let session = wiki
            .setup(" admin@example.com ", "  Admin  ", "pw", "pw")
            .unwrap();
        let (_, admin) = wiki.authenticate(&session.token).unwrap().unwrap();
        assert!(admin.admin);
        assert_eq!(admin.email, "admin@example.com");
        assert_eq!(admin.display_name, "Admin");
        assert!(!wiki.needs_setup().unwrap());
        assert!(dir.path().join("users.db").is_file());

        assert!(matches!(
            wiki.setup("other@example.com", "Other", "pw", "pw"),
            Err(WikiError::AlreadySetUp)
        ));
    }

    #[test]
    fn setup_validates_input() {
        let (_dir, wiki) = wiki();
        assert!(matches!(
            wiki.setup("a@example.com", "A", "pw", "other"),
            Err(WikiError::PasswordMismatch)
        ));
        assert!(matches!(
            wiki.setup("not-an-email", "A", "pw", "pw"),
            Err(WikiError::InvalidEmail(_))
        ));
        assert!(matches!(
            wiki.setup("a@example.com", "   ", "pw", "pw"),
            Err(WikiError::EmptyField("display name"))
        ));
        assert!(matches!(
            wiki.setup("a@example.com", "A", "", ""),
            Err(WikiError::EmptyField("password"))
        ));
        assert!(wiki.needs_setup().unwrap());
    }

    #[test]
    fn login_and_logout() {
        let (_dir, wiki) = wiki();
        let (_, user) = admin_and_user(&wiki);

        let session = wiki.login("  user@example.com ", "pw").unwrap();
        assert_eq!(session.user_id, user.id);
        assert!(matches!(
            wiki.login("user@example.com", "wrong"),
            Err(WikiError::InvalidCredentials)
        ));
        assert!(matches!(wiki.login("", "pw"), Err(WikiError::InvalidCredentials)));

        assert!(wiki.logout(&session.token).unwrap());
        assert!(wiki.authenticate(&session.token).unwrap().is_none());
    }

    #[test]
    fn state_survives_reopen() {
        let (dir, wiki) = wiki();
        admin_and_user(&wiki);
        let config = wiki.config().clone();
        drop(wiki);

        let reopened = Wiki::open(config).unwrap();
        assert!(!reopened.needs_setup().unwrap());
        assert!(reopened.login("user@example.com", "pw").is_ok());
        assert!(dir.path().join("content").is_dir());
    }

    // ---- Account management ----

    #[test]
    fn change_password_rules() {
        let (_dir, wiki) = wiki();
        let (_, user) = admin_and_user(&wiki);

        assert!(matches!(
            wiki.change_password(user.id, "", "new", "new"),
            Err(WikiError::EmptyField(_))
        ));
        assert!(matches!(
            wiki.change_password(user.id, "pw", "new", "neW"),
            Err(WikiError::PasswordMismatch)
        ));
        assert!(matches!(
            wiki.change_password(user.id, "pw", "pw", "pw"),
            Err(WikiError::PasswordUnchanged)
        ));
        assert!(matches!(
            wiki.change_password(user.id, "guess", "new", "new"),
            Err(WikiError::IncorrectPassword)
        ));

        wiki.change_password(user.id, "pw", "new", "new").unwrap();
        assert!(wiki.login("user@example.com", "pw").is_err());
        assert!(wiki.login("user@example.com", "new").is_ok());
    }

    #[test]
    fn update_profile_trims_and_validates() {
        let (_dir, wiki) = wiki();
        let (admin, user) = admin_and_user(&wiki);

        let updated = wiki
            .update_profile(user.id, " renamed@example.com ", "  Renamed ")
            .unwrap();
        assert_eq!(updated.email, "renamed@example.com");
        assert_eq!(updated.display_name, "Renamed");

        assert!(matches!(
            wiki.update_profile(user.id, "nope", "Renamed"),
            Err(WikiError::InvalidEmail(_))
        ));
        assert!(matches!(
            wiki.update_profile(user.id, &admin.email, "Renamed"),
            Err(WikiError::Auth(AuthError::DuplicateEmail(_)))
        ));
    }

    #[test]
    fn only_admins_create_users() {
        let (_dir, wiki) = wiki();
        let (_, user) = admin_and_user(&wiki);
        assert!(matches!(
            wiki.create_user(user.id, "x@example.com", "X", "pw", false),
            Err(WikiError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_rights_are_read_from_the_store() {
        let (_dir, wiki) = wiki();
        let (admin, _) = admin_and_user(&wiki);
        wiki.credentials().set_admin(admin.id, false).unwrap();
        assert!(matches!(
            wiki.create_user(admin.id, "x@example.com", "X", "pw", false),
            Err(WikiError::Forbidden(_))
        ));
    }

    #[test]
    fn delete_own_account_ends_every_session() {
        let (_dir, wiki) = wiki();
        let (_, user) = admin_and_user(&wiki);
        let first = wiki.login("user@example.com", "pw").unwrap();
        let second = wiki.login("user@example.com", "pw").unwrap();

        wiki.delete_own_account(user.id).unwrap();
        assert!(wiki.authenticate(&first.token).unwrap().is_none());
        assert!(wiki.authenticate(&second.token).unwrap().is_none());
        assert!(matches!(
            wiki.delete_own_account(user.id),
            Err(WikiError::UserNotFound(_))
        ));

        let reloaded = Wiki::open(wiki.config().clone()).unwrap();
        assert!(reloaded.credentials().user(user.id).unwrap().is_none());
    }

    #[test]
    fn admin_deletes_other_user() {
        let (_dir, wiki) = wiki();
        let (admin, user) = admin_and_user(&wiki);
        let admin_session = wiki.login("admin@example.com", "pw").unwrap();
        let user_session = wiki.login("user@example.com", "pw").unwrap();

        assert!(matches!(
            wiki.delete_user_as_admin(user.id, admin.id),
            Err(WikiError::Forbidden(_))
        ));
        assert!(matches!(
            wiki.delete_user_as_admin(admin.id, admin.id),
            Err(WikiError::Forbidden(_))
        ));

        wiki.delete_user_as_admin(admin.id, user.id).unwrap();
        assert!(wiki.authenticate(&user_session.token).unwrap().is_none());
        assert!(wiki.authenticate(&admin_session.token).unwrap().is_some());
        assert!(matches!(
            wiki.delete_user_as_admin(admin.id, user.id),
            Err(WikiError::UserNotFound(_))
        ));
    }

    #[test]
    fn reset_password_skips_old_password() {
        let (_dir, wiki) = wiki();
        let (_, user) = admin_and_user(&wiki);
        wiki.reset_password(user.id, "fresh").unwrap();
        assert!(wiki.login("user@example.com", "fresh").is_ok());

        wiki.delete_own_account(user.id).unwrap();
        assert!(matches!(
            wiki.reset_password(user.id, "x"),
            Err(WikiError::UserNotFound(_))
        ));
    }

    // ---- Articles ----

    #[test]
    fn save_and_view_article() {
        let (_dir, wiki) = wiki();
        let saved = wiki
            .save_article("/guides/setup/", "\r\n# Setup\r\nRun it.\r\n\r\n")
            .unwrap();
        assert_eq!(saved.title(), "setup");
        assert_eq!(saved.content, b"# Setup\nRun it.");

        match wiki.view("guides/setup").unwrap() {
            Page::Article {
                article,
                html,
                category,
            } => {
                assert_eq!(article, saved);
                assert_eq!(html, "<h1>Setup</h1>\n<p>Run it.</p>\n");
                assert_eq!(category.name, "guides");
                assert_eq!(category.entries, vec!["setup"]);
            }
            other => panic!("expected article, got {other:?}"),
        }

        match wiki.view("guides").unwrap() {
            Page::Category(category) => assert_eq!(category.entries, vec!["setup"]),
            other => panic!("expected category, got {other:?}"),
        }
        assert_eq!(wiki.index().unwrap().entries, vec!["guides"]);
    }

    #[test]
    fn article_paths_are_validated() {
        let (_dir, wiki) = wiki();
        assert!(matches!(
            wiki.save_article("../escape", "x"),
            Err(WikiError::Path(_))
        ));
        assert!(matches!(
            wiki.save_article("/", "x"),
            Err(WikiError::Content(ContentError::InvalidPath { .. }))
        ));
        assert!(matches!(
            wiki.view("missing"),
            Err(WikiError::Content(ContentError::NotFound(_)))
        ));
    }

    #[test]
    fn delete_and_list_articles() {
        let (_dir, wiki) = wiki();
        wiki.save_article("b", "B").unwrap();
        wiki.save_article("a/c", "C").unwrap();
        let listed: Vec<String> = wiki.articles().unwrap().into_iter().map(String::from).collect();
        assert_eq!(listed, vec!["a/c", "b"]);

        wiki.delete_article("b").unwrap();
        assert!(matches!(
            wiki.delete_article("b"),
            Err(WikiError::Content(ContentError::NotFound(_)))
        ));
        assert_eq!(wiki.articles().unwrap().len(), 1);
    }

    #[test]
    fn email_validation() {
        assert_eq!(validate_email(" a@b.example ").unwrap(), "a@b.example");
        assert_eq!(
            validate_email("Ada <ada@example.com>").unwrap(),
            "ada@example.com"
        );
        assert_eq!(validate_email("root@localhost").unwrap(), "root@localhost");
        for bad in ["", "plain", "@example.com", "a@", "a b@example.com", "a@@b", "a@b..c"] {
            assert!(validate_email(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
