// crates/kjvonly-core/src/user.rs
//
// User domain models shared by the user service and the store adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;

/// An individual user of the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Normalized (trimmed, lower-case) email address. Unique.
    pub email: String,
    pub roles: Vec<Role>,
    /// Argon2 PHC string. Never sent over the wire.
    #[serde(default, skip_serializing)]
    pub password_hash: String,
    #[serde(default)]
    pub department: String,
    pub enabled: bool,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// Information needed to create a new user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub department: String,
    pub password: String,
    pub password_confirm: String,
}

/// A partial update of an existing user, keyed by email.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<Role>>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_confirm: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Normalize and minimally validate an email address.
///
/// Accepts `local@domain` where both parts are non-empty, the domain
/// contains a dot that is neither its first nor last character, and there
/// is no whitespace. Returns the trimmed, lower-cased address.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return None;
    }
    let dot = domain.find('.')?;
    if dot == 0 || domain.ends_with('.') {
        return None;
    }
    Some(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  User@Example.com "),
            Some("user@example.com".to_string())
        );
        assert_eq!(normalize_email("a@b.co"), Some("a@b.co".to_string()));
    }

    #[test]
    fn test_normalize_email_rejects_garbage() {
        for bad in ["", "user", "@example.com", "user@", "user@example", "a@@b.com", "a b@c.com", "a@.com", "a@com."] {
            assert_eq!(normalize_email(bad), None, "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            name: "John Doe".to_string(),
            email: "user@example.com".to_string(),
            roles: vec![Role::Admin],
            password_hash: "$argon2id$v=19$secret".to_string(),
            department: String::new(),
            enabled: true,
            date_created: now,
            date_updated: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
    }
}
