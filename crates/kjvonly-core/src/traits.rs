// crates/kjvonly-core/src/traits.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::{SearchError, StoreError};
use crate::search::SqlResult;
use crate::user::{UpdateUser, User};

/// Trait for user persistence and credential checks.
///
/// Implemented by kjvonly-store (in-memory document store). Every method
/// takes the call's context so implementations can stop when it is
/// cancelled.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `DuplicateKey` if the email exists.
    async fn create(&self, ctx: &RequestContext, user: User) -> Result<User, StoreError>;

    /// Fetch a user by id.
    async fn query_by_id(&self, ctx: &RequestContext, id: &Uuid) -> Result<User, StoreError>;

    /// Fetch a user by (normalized) email.
    async fn query_by_email(&self, ctx: &RequestContext, email: &str) -> Result<User, StoreError>;

    /// List every user, ordered by email.
    async fn query_all(&self, ctx: &RequestContext) -> Result<Vec<User>, StoreError>;

    /// Apply a partial update. `password_hash` replaces the stored hash when
    /// present; the caller hashes.
    async fn update(
        &self,
        ctx: &RequestContext,
        update: UpdateUser,
        password_hash: Option<String>,
    ) -> Result<User, StoreError>;

    /// Remove a user by email and return the removed record.
    async fn delete(&self, ctx: &RequestContext, email: &str) -> Result<User, StoreError>;

    /// Verify a secret for the given email.
    ///
    /// Any failure is `StoreError::AuthenticationFailed`; implementations
    /// must not reveal whether the identity exists.
    async fn authenticate(
        &self,
        ctx: &RequestContext,
        email: &str,
        secret: &str,
    ) -> Result<User, StoreError>;
}

/// Trait for the external search engine.
///
/// Implemented by kjvonly-store (Elasticsearch SQL endpoint).
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Run a query and return its tabular result.
    async fn run_query(&self, ctx: &RequestContext, text: &str) -> Result<SqlResult, SearchError>;
}
