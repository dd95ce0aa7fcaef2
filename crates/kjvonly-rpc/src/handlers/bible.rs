// crates/kjvonly-rpc/src/handlers/bible.rs
//
// BibleSearchService: public passthrough from an RPC call to the search
// engine's SQL endpoint.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use kjvonly_core::{RequestContext, SearchEngine, SqlResult};

use crate::registry::{Endpoint, RpcService};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Search {
    #[serde(default)]
    pub query: String,
}

/// Request for `BibleSearchService.Search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub search: Search,
}

/// Response for `BibleSearchService.Search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub search_results: SqlResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct BibleSearchService {
    engine: Arc<dyn SearchEngine>,
}

impl BibleSearchService {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self { engine }
    }

    pub async fn search(self: Arc<Self>, req: SearchRequest, ctx: RequestContext) -> SearchResponse {
        let query = req.search.query.trim();
        if query.is_empty() {
            return SearchResponse {
                search_results: SqlResult::default(),
                error: Some("query must not be empty".to_string()),
            };
        }

        match self.engine.run_query(&ctx, query).await {
            Ok(search_results) => {
                tracing::debug!(rows = search_results.len(), "Search completed");
                SearchResponse {
                    search_results,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!("Search failed: {}", e);
                SearchResponse {
                    search_results: SqlResult::default(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

impl RpcService for BibleSearchService {
    const NAME: &'static str = "BibleSearchService";

    fn endpoints(self: Arc<Self>) -> Vec<(&'static str, Endpoint)> {
        vec![("Search", Endpoint::bound(&[], &self, Self::search))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use kjvonly_core::{Column, SearchError};
    use std::sync::Mutex;

    /// Records every query and answers from a canned result.
    struct FakeEngine {
        seen: Mutex<Vec<String>>,
        result: Result<SqlResult, SearchError>,
    }

    #[async_trait]
    impl SearchEngine for FakeEngine {
        async fn run_query(&self, _ctx: &RequestContext, text: &str) -> Result<SqlResult, SearchError> {
            self.seen.lock().unwrap().push(text.to_string());
            self.result.clone()
        }
    }

    fn service(result: Result<SqlResult, SearchError>) -> (Arc<BibleSearchService>, Arc<FakeEngine>) {
        let engine = Arc::new(FakeEngine {
            seen: Mutex::new(Vec::new()),
            result,
        });
        (Arc::new(BibleSearchService::new(engine.clone())), engine)
    }

    fn request(query: &str) -> SearchRequest {
        SearchRequest {
            search: Search {
                query: query.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_search_passes_query_through() {
        let table = SqlResult {
            columns: vec![Column {
                name: "text".to_string(),
                column_type: "text".to_string(),
            }],
            rows: vec![vec![serde_json::json!("Jesus wept.")]],
        };
        let (svc, engine) = service(Ok(table.clone()));
        let resp = svc
            .search(request("SELECT text FROM kjv WHERE verse = 35"), RequestContext::background(Utc::now()))
            .await;
        assert_eq!(resp.error, None);
        assert_eq!(resp.search_results, table);
        assert_eq!(
            engine.seen.lock().unwrap().as_slice(),
            ["SELECT text FROM kjv WHERE verse = 35".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_query_never_reaches_engine() {
        let (svc, engine) = service(Ok(SqlResult::default()));
        let resp = svc.search(request("   "), RequestContext::background(Utc::now())).await;
        assert_eq!(resp.error.as_deref(), Some("query must not be empty"));
        assert!(engine.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_engine_error_becomes_business_error() {
        let (svc, _) = service(Err(SearchError::Status(500)));
        let resp = svc.search(request("SELECT 1"), RequestContext::background(Utc::now())).await;
        assert_eq!(resp.error.as_deref(), Some("search engine returned status 500"));
        assert!(resp.search_results.is_empty());
    }
}
