// crates/kjvonly-core/src/claims.rs
//
// Claims: the authenticated (or anonymous) caller for the duration of one call.
//
// Claims are built by the token service, either at issuance or when a
// presented token is verified. They are never persisted.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Identity, roles and validity window of a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier (user id). `None` for anonymous callers.
    pub subject: Option<String>,
    /// Issuer that signed the token these claims came from.
    pub issuer: String,
    /// Roles held by the caller.
    pub roles: BTreeSet<Role>,
    /// When the claims were issued.
    pub issued_at: DateTime<Utc>,
    /// When the claims stop being valid.
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Claims for a caller that presented no valid token.
    pub fn anonymous() -> Self {
        Self {
            subject: None,
            issuer: String::new(),
            roles: BTreeSet::new(),
            issued_at: DateTime::UNIX_EPOCH,
            expires_at: DateTime::UNIX_EPOCH,
        }
    }

    /// Claims for a subject holding the given roles.
    ///
    /// The issuer and validity window are filled in by the token service
    /// when the claims are signed.
    pub fn for_subject(subject: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            subject: Some(subject.into()),
            roles: roles.into_iter().collect(),
            ..Self::anonymous()
        }
    }

    /// Whether these claims describe an unauthenticated caller.
    pub fn is_anonymous(&self) -> bool {
        self.subject.is_none()
    }

    /// Whether the caller holds at least one of `required`.
    ///
    /// An empty `required` list is satisfied by every caller.
    pub fn has_any_role(&self, required: &[Role]) -> bool {
        required.is_empty() || required.iter().any(|role| self.roles.contains(role))
    }
}

impl Default for Claims {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_has_no_identity() {
        let claims = Claims::anonymous();
        assert!(claims.is_anonymous());
        assert!(claims.roles.is_empty());
    }

    #[test]
    fn test_duplicate_roles_collapse() {
        let claims = Claims::for_subject("u1", [Role::Admin, Role::Admin, Role::User]);
        assert_eq!(claims.roles.len(), 2);
        assert!(!claims.is_anonymous());
    }

    #[test]
    fn test_has_any_role() {
        let admin = Claims::for_subject("u1", [Role::Admin]);
        let user = Claims::for_subject("u2", [Role::User]);
        let anon = Claims::anonymous();

        assert!(admin.has_any_role(&[Role::Admin]));
        assert!(admin.has_any_role(&[Role::User, Role::Admin]));
        assert!(!user.has_any_role(&[Role::Admin]));
        assert!(!anon.has_any_role(&[Role::User]));

        // Empty requirement admits everyone, including anonymous callers.
        assert!(anon.has_any_role(&[]));
    }
}
