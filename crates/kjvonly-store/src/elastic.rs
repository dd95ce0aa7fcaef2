// crates/kjvonly-store/src/elastic.rs
//
// Elasticsearch SQL client implementing the `SearchEngine` trait.
// Uses reqwest against the `_sql` endpoint of an Elasticsearch node.

use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use reqwest::StatusCode;

use kjvonly_core::{RequestContext, SearchEngine, SearchError, SqlResult};

/// Client for the Elasticsearch SQL API.
#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    /// Base URL of the Elasticsearch node (e.g., "http://127.0.0.1:9200").
    pub base_url: String,
    client: reqwest::Client,
}

impl ElasticsearchClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// POST {base}/_sql?format=json with `{"query": text}`.
    async fn sql(&self, text: &str) -> Result<SqlResult, SearchError> {
        let url = format!("{}/_sql?format=json", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(CACHE_CONTROL, "no-cache")
            .json(&serde_json::json!({ "query": text }))
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Elasticsearch SQL query failed ({}): {}", status, body);
            return Err(SearchError::Status(status.as_u16()));
        }

        response
            .json::<SqlResult>()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SearchEngine for ElasticsearchClient {
    async fn run_query(&self, ctx: &RequestContext, text: &str) -> Result<SqlResult, SearchError> {
        if ctx.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                tracing::debug!("Search cancelled before Elasticsearch answered");
                Err(SearchError::Cancelled)
            }
            result = self.sql(text) => result,
        }
    }
}
