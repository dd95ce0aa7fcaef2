// crates/kjvonly-core/src/role.rs
//
// Role: the closed set of identity attributes used for authorization.
//
// Roles travel as upper-case strings ("ADMIN", "USER") in tokens, stored
// records and request bodies. Anything else is rejected outright.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An authorization role held by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    /// Full administrative access to user management.
    Admin,
    /// Regular authenticated user.
    User,
}

/// Returned when a role string is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0:?}")]
pub struct RoleParseError(pub String);

impl Role {
    /// The canonical wire spelling of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            other => Err(RoleParseError(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = RoleParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_roles() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
    }

    #[test]
    fn test_unknown_role_is_an_error() {
        // Case matters: stored and token data always use the canonical form.
        assert_eq!(
            "admin".parse::<Role>(),
            Err(RoleParseError("admin".to_string()))
        );
        assert!("SUPERUSER".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn test_serde_uses_canonical_spelling() {
        let json = serde_json::to_string(&vec![Role::Admin, Role::User]).unwrap();
        assert_eq!(json, r#"["ADMIN","USER"]"#);

        let parsed: Vec<Role> = serde_json::from_str(r#"["USER"]"#).unwrap();
        assert_eq!(parsed, vec![Role::User]);

        let bad: Result<Vec<Role>, _> = serde_json::from_str(r#"["USER","ROOT"]"#);
        assert!(bad.is_err());
    }
}
