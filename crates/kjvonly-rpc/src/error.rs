// crates/kjvonly-rpc/src/error.rs
//
// Transport-level errors for the gateway. These become HTTP status codes
// with a plain-text body; business errors never use them.

use http::StatusCode;
use thiserror::Error;

/// A call that was rejected before or instead of producing a response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown method")]
    UnknownMethod,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("method not allowed")]
    MethodNotAllowed,

    /// The handler's response could not be encoded. Detail is logged only.
    #[error("internal error")]
    Internal(String),
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::UnknownMethod => StatusCode::NOT_FOUND,
            DispatchError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DispatchError::Unauthenticated => StatusCode::UNAUTHORIZED,
            DispatchError::Forbidden => StatusCode::FORBIDDEN,
            DispatchError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Startup errors while assembling the service registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{service}.{method} is registered more than once")]
    Duplicate { service: String, method: String },
}
