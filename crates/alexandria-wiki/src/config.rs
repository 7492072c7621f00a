//! Wiki configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, an
//! optional TOML file, and the `ALEXANDRIA_*` environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use alexandria_auth::DEFAULT_TOKEN_LEN;
use alexandria_crypto::HashParams;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{WikiError, WikiResult};

pub const ENV_DATA_PATH: &str = "ALEXANDRIA_DATA_PATH";
pub const ENV_CONTENT_PATH: &str = "ALEXANDRIA_CONTENT_PATH";
pub const ENV_USER_STORAGE_PATH: &str = "ALEXANDRIA_USER_STORAGE_PATH";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WikiConfig {
    /// Base directory for everything the wiki stores.
    pub data_path: PathBuf,
    /// Article tree. Defaults to `<data_path>/content`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_path: Option<PathBuf>,
    /// Credential file. Defaults to `<data_path>/users.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_storage_path: Option<PathBuf>,
    pub session_token_len: usize,
    /// Parameters stamped onto newly hashed passwords.
    pub hash: HashParams,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data"),
            content_path: None,
            user_storage_path: None,
            session_token_len: DEFAULT_TOKEN_LEN,
            hash: HashParams::default(),
        }
    }
}

impl WikiConfig {
    /// Defaults rooted at `data_path`.
    pub fn with_data_path(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            ..Self::default()
        }
    }

    /// Build the effective configuration: defaults, then `file` if given,
    /// then the environment.
    pub fn load(file: Option<&Path>) -> WikiResult<Self> {
        let mut config = match file {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                debug!(path = %path.display(), "read configuration file");
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> WikiResult<Self> {
        toml::from_str(text).map_err(|e| WikiError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> WikiResult<String> {
        toml::to_string_pretty(self).map_err(|e| WikiError::Config(e.to_string()))
    }

    /// Apply overrides from `lookup`, usually the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_DATA_PATH) {
            self.data_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_CONTENT_PATH) {
            self.content_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup(ENV_USER_STORAGE_PATH) {
            self.user_storage_path = Some(PathBuf::from(v));
        }
    }

    pub fn validate(&self) -> WikiResult<()> {
        if self.session_token_len < 16 {
            return Err(WikiError::Config(format!(
                "session_token_len must be at least 16, got {}",
                self.session_token_len
            )));
        }
        Ok(())
    }

    pub fn content_path(&self) -> PathBuf {
        self.content_path
            .clone()
            .unwrap_or_else(|| self.data_path.join("content"))
    }

    pub fn user_storage_path(&self) -> PathBuf {
        self.user_storage_path
            .clone()
            .unwrap_or_else(|| self.data_path.join("users.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config() {
        let c = WikiConfig::default();
        assert_eq!(c.content_path(), PathBuf::from("data/content"));
        assert_eq!(c.user_storage_path(), PathBuf::from("data/users.db"));
        assert_eq!(c.hash, HashParams::default());
        assert_eq!(c.session_token_len, 32);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn explicit_paths_override_data_path() {
        let c = WikiConfig {
            content_path: Some("/srv/articles".into()),
            ..WikiConfig::with_data_path("/srv/wiki")
        };
        assert_eq!(c.content_path(), PathBuf::from("/srv/articles"));
        assert_eq!(c.user_storage_path(), PathBuf::from("/srv/wiki/users.db"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = WikiConfig::from_toml_str("data_path = \"/var/lib/alexandria\"\n").unwrap();
        assert_eq!(c.data_path, PathBuf::from("/var/lib/alexandria"));
        assert_eq!(c.hash, HashParams::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            WikiConfig::from_toml_str("data_pth = \"x\"\n"),
            Err(WikiError::Config(_))
        ));
    }

    #[test]
    fn toml_round_trip() {
        let c = WikiConfig::with_data_path("/tmp/wiki");
        let text = c.to_toml_string().unwrap();
        assert_eq!(WikiConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn environment_overrides_file() {
        let env: HashMap<&str, &str> = [
            (ENV_DATA_PATH, "/env/data"),
            (ENV_USER_STORAGE_PATH, "/env/users.db"),
        ]
        .into_iter()
        .collect();

        let mut c = WikiConfig::from_toml_str("data_path = \"/file/data\"\n").unwrap();
        c.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(c.content_path(), PathBuf::from("/env/data/content"));
        assert_eq!(c.user_storage_path(), PathBuf::from("/env/users.db"));
    }

    #[test]
    fn short_tokens_are_rejected() {
        let c = WikiConfig {
            session_token_len: 8,
            ..WikiConfig::default()
        };
        assert!(matches!(c.validate(), Err(WikiError::Config(_))));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alexandria.toml");
        fs::write(&path, "session_token_len = 40\n").unwrap();
        let c = WikiConfig::load(Some(&path)).unwrap();
        assert_eq!(c.session_token_len, 40);

        assert!(matches!(
            WikiConfig::load(Some(&dir.path().join("missing.toml"))),
            Err(WikiError::Io(_))
        ));
    }
}
