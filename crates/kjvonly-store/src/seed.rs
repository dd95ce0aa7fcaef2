// crates/kjvonly-store/src/seed.rs
//
// Seed loader: populates a user store from a JSON file at startup.
//
// The file is a JSON array of entries:
//   [{"name": "...", "email": "...", "roles": ["ADMIN"], "department": "...", "password": "..."}]
// Passwords are hashed on load. Any bad entry aborts the whole seed.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use kjvonly_auth::{hash_password, PasswordError};
use kjvonly_core::user::normalize_email;
use kjvonly_core::{RequestContext, Role, StoreError, User, UserStore};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("cannot read seed file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("invalid seed file: {0}")]
    Parse(String),

    #[error("seed entry {index}: {reason}")]
    InvalidEntry { index: usize, reason: String },

    #[error("seed entry {index}: {source}")]
    Password {
        index: usize,
        #[source]
        source: PasswordError,
    },

    #[error("seed entry {index}: {source}")]
    Store {
        index: usize,
        #[source]
        source: StoreError,
    },
}

/// One user to create.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub department: String,
    pub password: String,
}

/// Parse a seed file. Unknown role strings fail the parse.
pub fn load_seed_file(path: impl AsRef<Path>) -> Result<Vec<SeedUser>, SeedError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| SeedError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|e| SeedError::Parse(e.to_string()))
}

/// Create every entry in `store`, stamped with `now`. Returns the number of
/// users created.
pub async fn seed_users(
    store: &dyn UserStore,
    entries: Vec<SeedUser>,
    now: DateTime<Utc>,
) -> Result<usize, SeedError> {
    let ctx = RequestContext::background(now);
    let count = entries.len();

    for (index, entry) in entries.into_iter().enumerate() {
        let email = normalize_email(&entry.email).ok_or_else(|| SeedError::InvalidEntry {
            index,
            reason: "invalid email format".to_string(),
        })?;
        let password_hash =
            hash_password(&entry.password).map_err(|source| SeedError::Password { index, source })?;

        let user = User {
            id: Uuid::now_v7(),
            name: entry.name,
            email,
            roles: entry.roles,
            password_hash,
            department: entry.department,
            enabled: true,
            date_created: now,
            date_updated: now,
        };
        store
            .create(&ctx, user)
            .await
            .map_err(|source| SeedError::Store { index, source })?;
    }

    tracing::info!("Seeded {} user(s)", count);
    Ok(count)
}
