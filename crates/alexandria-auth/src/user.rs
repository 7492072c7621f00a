use alexandria_crypto::PasswordRecord;
use alexandria_types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A wiki account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unassigned until the user is added to a credential store.
    pub id: UserId,
    pub admin: bool,
    pub email: String,
    pub display_name: String,
    pub created_at: Timestamp,
    pub password: PasswordRecord,
}

impl User {
    /// Case-insensitive email comparison, the rule uniqueness is enforced by.
    pub fn has_email(&self, email: &str) -> bool {
        self.email.to_lowercase() == email.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alexandria_crypto::HashParams;

    fn user(email: &str) -> User {
        User {
            id: UserId::new(1),
            admin: false,
            email: email.into(),
            display_name: "Someone".into(),
            created_at: Timestamp::from_secs(0),
            password: PasswordRecord {
                digest: "00".into(),
                salt: "s".into(),
                params: HashParams::MINIMUM,
            },
        }
    }

    #[test]
    fn email_match_ignores_case() {
        let u = user("Ada@Example.com");
        assert!(u.has_email("ada@example.com"));
        assert!(u.has_email("ADA@EXAMPLE.COM"));
        assert!(!u.has_email("ada@example.org"));
    }

    #[test]
    fn email_match_handles_non_ascii() {
        assert!(user("ÉLODIE@example.com").has_email("élodie@example.com"));
    }
}
