// crates/kjvonly-rpc/src/middleware.rs
//
// Request plumbing for the gateway: route parsing, bearer extraction, and
// per-call logging. Call logs never include tokens or request bodies.

use std::time::Duration;

use http::header::AUTHORIZATION;
use http::{HeaderMap, StatusCode};

/// URL prefix under which every RPC route lives.
pub const RPC_PREFIX: &str = "/v1/";

/// Split `/v1/{Service}.{Method}` into its parts.
pub fn parse_rpc_path(path: &str) -> Option<(&str, &str)> {
    let route = path.strip_prefix(RPC_PREFIX)?;
    let (service, method) = route.split_once('.')?;
    let valid = |part: &str| {
        !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    if valid(service) && valid(method) {
        Some((service, method))
    } else {
        None
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// A missing header, another scheme, or an empty token all mean "no token".
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Log a finished call.
pub fn log_call(path: &str, status: StatusCode, elapsed: Duration) {
    let latency_ms = elapsed.as_secs_f64() * 1000.0;
    if status.is_server_error() {
        tracing::error!(path, status = status.as_u16(), latency_ms, "RPC call failed");
    } else if status.is_success() {
        tracing::info!(path, status = status.as_u16(), latency_ms, "RPC call");
    } else {
        tracing::warn!(path, status = status.as_u16(), latency_ms, "RPC call rejected");
    }
}
