// crates/kjvonly-cli/src/rpc_client.rs
//
// Lightweight client that POSTs JSON to the gateway's `/v1/{Service}.{Method}`
// routes.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcCallError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway rejected the call before it reached a handler.
    #[error("gateway returned {status}: {reason}")]
    Rejected { status: u16, reason: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Send one call and return the decoded response body.
///
/// `route` is `Service.Method`. Handler-level failures come back as a
/// normal body with an `error` field; only transport rejections are errors.
pub async fn rpc_call(
    endpoint: &str,
    route: &str,
    body: &Value,
    token: Option<&str>,
) -> Result<Value, RpcCallError> {
    let url = format!("{}/v1/{}", endpoint.trim_end_matches('/'), route);

    let client = reqwest::Client::new();
    let mut request = client.post(&url).json(body);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let resp = request.send().await?;

    let status = resp.status();
    if !status.is_success() {
        let reason = resp.text().await.unwrap_or_default();
        return Err(RpcCallError::Rejected {
            status: status.as_u16(),
            reason: reason.trim().to_string(),
        });
    }

    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| RpcCallError::Decode(e.to_string()))
}
