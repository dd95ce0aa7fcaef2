// crates/kjvonly-core/src/error.rs
//
// Error types for the collaborator traits.

use thiserror::Error;

/// Errors returned by `UserStore` implementations.
///
/// Every kind of credential failure maps to `AuthenticationFailed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record matches the given key.
    #[error("user not found")]
    NotFound,

    /// A record with the same unique key already exists.
    #[error("email is not unique")]
    DuplicateKey,

    /// Credential check failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// A stored record could not be converted into a domain value.
    #[error("invalid stored record: {0}")]
    InvalidRecord(String),

    /// The call was cancelled before the store finished.
    #[error("request cancelled")]
    Cancelled,

    /// Backend failure (lock poisoning, I/O).
    #[error("storage error: {0}")]
    Backend(String),
}

/// Errors returned by `SearchEngine` implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The request could not be sent or the connection failed.
    #[error("search request failed: {0}")]
    Request(String),

    /// The search engine answered with a non-success status.
    #[error("search engine returned status {0}")]
    Status(u16),

    /// The response body was not a tabular result.
    #[error("could not decode search response: {0}")]
    Decode(String),

    /// The call was cancelled before the search engine answered.
    #[error("request cancelled")]
    Cancelled,
}
