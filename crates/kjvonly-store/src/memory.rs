// crates/kjvonly-store/src/memory.rs
//
// In-memory document store implementing the `UserStore` trait.
//
// Records are kept keyed by normalized email, the way the document
// collection is keyed in production. Roles are stored as plain strings and
// converted back into `Role` on every read, so a record holding an unknown
// role surfaces as `InvalidRecord` instead of silently losing access.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use kjvonly_auth::{hash_password, verify_password};
use kjvonly_core::{RequestContext, Role, StoreError, UpdateUser, User, UserStore};

/// A user as persisted in the document collection.
#[derive(Debug, Clone)]
struct StoredUser {
    id: Uuid,
    name: String,
    email: String,
    roles: Vec<String>,
    password_hash: String,
    department: String,
    enabled: bool,
    date_created: DateTime<Utc>,
    date_updated: DateTime<Utc>,
}

impl From<User> for StoredUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            roles: user.roles.iter().map(|r| r.as_str().to_string()).collect(),
            password_hash: user.password_hash,
            department: user.department,
            enabled: user.enabled,
            date_created: user.date_created,
            date_updated: user.date_updated,
        }
    }
}

impl TryFrom<StoredUser> for User {
    type Error = StoreError;

    fn try_from(record: StoredUser) -> Result<Self, Self::Error> {
        let roles = record
            .roles
            .iter()
            .map(|r| r.parse::<Role>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::InvalidRecord(format!("user {}: {}", record.id, e)))?;
        Ok(User {
            id: record.id,
            name: record.name,
            email: record.email,
            roles,
            password_hash: record.password_hash,
            department: record.department,
            enabled: record.enabled,
            date_created: record.date_created,
            date_updated: record.date_updated,
        })
    }
}

/// Hash checked when the requested identity does not exist, so a lookup
/// miss costs the same as a wrong password.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password("kjvonly-dummy-credential").unwrap_or_default())
}

/// In-memory `UserStore`.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    /// Map from normalized email to record.
    users: RwLock<HashMap<String, StoredUser>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.read().map(|users| users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_record<F>(&self, find: F) -> Result<StoredUser, StoreError>
    where
        F: Fn(&HashMap<String, StoredUser>) -> Option<&StoredUser>,
    {
        let users = self.users.read().map_err(|_| poisoned())?;
        find(&users).cloned().ok_or(StoreError::NotFound)
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("user store lock poisoned".to_string())
}

fn check_cancelled(ctx: &RequestContext) -> Result<(), StoreError> {
    if ctx.is_cancelled() {
        return Err(StoreError::Cancelled);
    }
    Ok(())
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, ctx: &RequestContext, user: User) -> Result<User, StoreError> {
        check_cancelled(ctx)?;
        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.contains_key(&user.email) {
            return Err(StoreError::DuplicateKey);
        }
        let record = StoredUser::from(user);
        users.insert(record.email.clone(), record.clone());
        tracing::debug!(id = %record.id, "Created user");
        User::try_from(record)
    }

    async fn query_by_id(&self, ctx: &RequestContext, id: &Uuid) -> Result<User, StoreError> {
        check_cancelled(ctx)?;
        let record = self.read_record(|users| users.values().find(|u| &u.id == id))?;
        User::try_from(record)
    }

    async fn query_by_email(&self, ctx: &RequestContext, email: &str) -> Result<User, StoreError> {
        check_cancelled(ctx)?;
        let record = self.read_record(|users| users.get(email))?;
        User::try_from(record)
    }

    async fn query_all(&self, ctx: &RequestContext) -> Result<Vec<User>, StoreError> {
        check_cancelled(ctx)?;
        let mut records: Vec<StoredUser> = {
            let users = self.users.read().map_err(|_| poisoned())?;
            users.values().cloned().collect()
        };
        records.sort_by(|a, b| a.email.cmp(&b.email));
        records.into_iter().map(User::try_from).collect()
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        update: UpdateUser,
        password_hash: Option<String>,
    ) -> Result<User, StoreError> {
        check_cancelled(ctx)?;
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let record = users.get_mut(&update.email).ok_or(StoreError::NotFound)?;

        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(roles) = update.roles {
            record.roles = roles.iter().map(|r| r.as_str().to_string()).collect();
        }
        if let Some(department) = update.department {
            record.department = department;
        }
        if let Some(enabled) = update.enabled {
            record.enabled = enabled;
        }
        if let Some(hash) = password_hash {
            record.password_hash = hash;
        }
        record.date_updated = ctx.now;

        User::try_from(record.clone())
    }

    async fn delete(&self, ctx: &RequestContext, email: &str) -> Result<User, StoreError> {
        check_cancelled(ctx)?;
        let record = {
            let mut users = self.users.write().map_err(|_| poisoned())?;
            users.remove(email).ok_or(StoreError::NotFound)?
        };
        tracing::debug!(id = %record.id, "Deleted user");
        User::try_from(record)
    }

    async fn authenticate(
        &self,
        ctx: &RequestContext,
        email: &str,
        secret: &str,
    ) -> Result<User, StoreError> {
        check_cancelled(ctx)?;
        let record = {
            let users = self.users.read().map_err(|_| poisoned())?;
            users.get(email).cloned()
        };

        let hash = match &record {
            Some(record) => record.password_hash.clone(),
            None => dummy_hash().to_string(),
        };
        let secret = secret.to_string();
        let matched = tokio::task::spawn_blocking(move || verify_password(&hash, &secret))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match record {
            Some(record) if matched && record.enabled => User::try_from(record),
            _ => {
                tracing::debug!("Credential check failed");
                Err(StoreError::AuthenticationFailed)
            }
        }
    }
}
