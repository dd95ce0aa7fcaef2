// crates/kjvonly-rpc/tests/gateway_http.rs
//
// End-to-end tests: a real GatewayServer on an ephemeral port, driven by
// reqwest.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use ed25519_dalek::SigningKey;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use uuid::Uuid;

use kjvonly_auth::{hash_password, KeyStore, TokenKey, TokenService};
use kjvonly_core::{
    Column, RequestContext, Role, SearchEngine, SearchError, SqlResult, User, UserStore,
};
use kjvonly_rpc::handlers::{BibleSearchService, UserService};
use kjvonly_rpc::{Dispatcher, GatewayServer, RpcConfig, ServiceRegistry};
use kjvonly_store::MemoryUserStore;

/// Answers every query with one row echoing the query text.
struct EchoEngine;

#[async_trait]
impl SearchEngine for EchoEngine {
    async fn run_query(&self, _ctx: &RequestContext, text: &str) -> Result<SqlResult, SearchError> {
        Ok(SqlResult {
            columns: vec![Column {
                name: "query".to_string(),
                column_type: "keyword".to_string(),
            }],
            rows: vec![vec![json!(text)]],
        })
    }
}

struct Gateway {
    base_url: String,
    client: reqwest::Client,
    shutdown: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

impl Gateway {
    async fn start() -> Self {
        let keys = KeyStore::from_keys(
            vec![TokenKey::signing("2025-e2e", SigningKey::from_bytes(&[21u8; 32]))],
            None,
        )
        .unwrap();
        let tokens = Arc::new(TokenService::new(keys, "kjvonly", Duration::hours(1)));

        let store = Arc::new(MemoryUserStore::new());
        let now = Utc::now();
        for (email, roles) in [
            ("admin@example.com", vec![Role::Admin, Role::User]),
            ("user@example.com", vec![Role::User]),
        ] {
            store
                .create(
                    &RequestContext::background(now),
                    User {
                        id: Uuid::now_v7(),
                        name: email.to_string(),
                        email: email.to_string(),
                        roles,
                        password_hash: hash_password("gophers").unwrap(),
                        department: String::new(),
                        enabled: true,
                        date_created: now,
                        date_updated: now,
                    },
                )
                .await
                .unwrap();
        }

        let mut builder = ServiceRegistry::builder();
        builder
            .mount(Arc::new(UserService::new(store, tokens.clone())))
            .unwrap()
            .mount(Arc::new(BibleSearchService::new(Arc::new(EchoEngine))))
            .unwrap();
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(builder.build()), tokens));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let server = GatewayServer::new(RpcConfig::default(), dispatcher);

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .serve_with_listener(listener, async move {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            shutdown: tx,
            handle,
        }
    }

    async fn post(&self, route: &str, body: Value, token: Option<&str>) -> reqwest::Response {
        let mut request = self
            .client
            .post(format!("{}/v1/{}", self.base_url, route))
            .json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.unwrap()
    }

    async fn login(&self, username: &str) -> String {
        let resp = self
            .post(
                "UserService.Authenticate",
                json!({"username": username, "password": "gophers"}),
                None,
            )
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn stop(self) {
        let Gateway {
            client,
            shutdown,
            handle,
            ..
        } = self;
        // Pooled keep-alive connections would hold the graceful shutdown open.
        drop(client);
        let _ = shutdown.send(());
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("gateway did not shut down")
            .unwrap();
    }
}

#[tokio::test]
async fn login_then_admin_call() {
    let gw = Gateway::start().await;
    let token = gw.login("admin@example.com").await;

    let resp = gw.post("UserService.QueryUser", json!({}), Some(&token)).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    let body: Value = resp.json().await.unwrap();
    let emails: Vec<&str> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails, vec!["admin@example.com", "user@example.com"]);
    assert!(body.get("error").is_none());

    gw.stop().await;
}

#[tokio::test]
async fn transport_errors_map_to_status_codes() {
    let gw = Gateway::start().await;
    let user_token = gw.login("user@example.com").await;

    let resp = gw.post("UserService.QueryUser", json!({}), None).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(resp.text().await.unwrap(), "unauthenticated");

    let resp = gw
        .post("UserService.QueryUser", json!({}), Some(&user_token))
        .await;
    assert_eq!(resp.status(), 403);
    assert_eq!(resp.text().await.unwrap(), "forbidden");

    let resp = gw.post("UserService.Nope", json!({}), Some(&user_token)).await;
    assert_eq!(resp.status(), 404);

    let resp = gw.post("NotAService", json!({}), None).await;
    assert_eq!(resp.status(), 404);

    let resp = gw
        .client
        .post(format!("{}/v1/UserService.Authenticate", gw.base_url))
        .body("{oops")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = gw
        .client
        .get(format!("{}/v1/UserService.Authenticate", gw.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);
    assert_eq!(resp.headers()["allow"].to_str().unwrap(), "POST");

    gw.stop().await;
}

#[tokio::test]
async fn paths_outside_v1_are_404() {
    let gw = Gateway::start().await;

    for path in [
        "/v2/UserService.QueryUser",
        "/v1/",
        "/v1",
        "/health",
        "/UserService.QueryUser",
        "/",
    ] {
        let resp = gw
            .client
            .post(format!("{}{}", gw.base_url, path))
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404, "path {path}");
        assert!(resp.headers().get("grpc-status").is_none(), "path {path}");
        assert_eq!(resp.text().await.unwrap(), "unknown method", "path {path}");
    }

    let resp = gw
        .client
        .get(format!("{}/health", gw.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    gw.stop().await;
}

#[tokio::test]
async fn business_errors_are_200() {
    let gw = Gateway::start().await;

    let resp = gw
        .post(
            "UserService.Authenticate",
            json!({"username": "admin@example.com", "password": "wrong"}),
            None,
        )
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"error": "authentication failed"}));

    let resp = gw
        .post(
            "UserService.Authenticate",
            json!({"username": "not-an-email", "password": "x"}),
            None,
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid email format");

    gw.stop().await;
}

#[tokio::test]
async fn public_search_with_and_without_token() {
    let gw = Gateway::start().await;

    let query = json!({"search": {"query": "SELECT * FROM kjv LIMIT 1"}});
    let resp = gw.post("BibleSearchService.Search", query.clone(), None).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["search_results"]["rows"][0][0], "SELECT * FROM kjv LIMIT 1");
    assert_eq!(body["search_results"]["columns"][0]["type"], "keyword");

    // A bad token on a public endpoint is not an error.
    let resp = gw
        .post("BibleSearchService.Search", query, Some("bogus.token.value"))
        .await;
    assert_eq!(resp.status(), 200);

    // Empty body decodes as `{}`, which is an empty query.
    let resp = gw
        .client
        .post(format!("{}/v1/BibleSearchService.Search", gw.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "query must not be empty");

    gw.stop().await;
}
