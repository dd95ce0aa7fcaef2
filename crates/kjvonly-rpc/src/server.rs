// crates/kjvonly-rpc/src/server.rs
//
// HTTP transport for the gateway: GatewayServer and RpcConfig.
//
// Uses tonic's server with HTTP/1 enabled. A single hand-written tower
// service is mounted at `/v1/*rest`; it parses `{Service}.{Method}` from the
// path itself and hands the call to the `Dispatcher`. Every other path hits
// a fallback that answers 404.
//
// Each call gets its own CancellationToken held by a drop guard: when the
// client goes away, hyper drops the call's future and the token fires.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderValue, Method, StatusCode};
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tonic::service::Routes;
use tonic::transport::server::TcpIncoming;
use tonic::transport::Server;
use tonic::Status;

use kjvonly_core::{Clock, SystemClock};

use crate::dispatch::{CallSignal, Dispatcher};
use crate::error::DispatchError;
use crate::middleware;

// ---------------------------------------------------------------------------
// RpcConfig
// ---------------------------------------------------------------------------

/// Configuration for the RPC server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Host to bind to (e.g., "127.0.0.1" or "0.0.0.0").
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Per-call deadline handed to handlers through the request context.
    pub request_timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// GatewayServer
// ---------------------------------------------------------------------------

/// The gateway's HTTP server.
#[derive(Clone)]
pub struct GatewayServer {
    config: RpcConfig,
    dispatcher: Arc<Dispatcher>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for GatewayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayServer")
            .field("config", &self.config)
            .field("routes", &self.dispatcher.registry().len())
            .finish()
    }
}

impl GatewayServer {
    pub fn new(config: RpcConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config,
            dispatcher,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock handed to handlers.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Bind to the configured address and serve until `shutdown` resolves.
    pub async fn start(
        &self,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        self.serve_with_listener(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve_with_listener(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            "kjvonly gateway listening on {} ({} routes)",
            local_addr,
            self.dispatcher.registry().len()
        );
        for route in self.dispatcher.registry().routes() {
            tracing::debug!("  POST {}{}", middleware::RPC_PREFIX, route);
        }

        let incoming = TcpIncoming::from_listener(listener, true, None)?;
        let service = GatewayService {
            inner: Arc::new(GatewayInner {
                dispatcher: self.dispatcher.clone(),
                clock: self.clock.clone(),
                request_timeout: self.config.request_timeout,
            }),
        };

        let router = axum::Router::new()
            .route_service("/v1/*rest", service)
            .fallback(unrouted);

        Server::builder()
            .accept_http1(true)
            .add_routes(Routes::from(router))
            .serve_with_incoming_shutdown(incoming, shutdown)
            .await?;

        tracing::info!("kjvonly gateway stopped");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tower service wiring
// ---------------------------------------------------------------------------

struct GatewayInner {
    dispatcher: Arc<Dispatcher>,
    clock: Arc<dyn Clock>,
    request_timeout: Duration,
}

impl GatewayInner {
    async fn handle<B>(&self, req: http::Request<B>) -> Result<Vec<u8>, DispatchError>
    where
        B: HttpBody + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
        B::Data: Send,
    {
        let (parts, body) = req.into_parts();
        if parts.method != Method::POST {
            return Err(DispatchError::MethodNotAllowed);
        }
        let (service, method) =
            middleware::parse_rpc_path(parts.uri.path()).ok_or(DispatchError::UnknownMethod)?;
        let bearer = middleware::bearer_token(&parts.headers);

        let body = collect_body(body).await.map_err(DispatchError::BadRequest)?;

        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();
        // An unrepresentable deadline means no deadline.
        let deadline = tokio::time::Instant::now().checked_add(self.request_timeout);

        self.dispatcher
            .dispatch(
                service,
                method,
                &body,
                bearer,
                self.clock.as_ref(),
                CallSignal::new(cancel, deadline),
            )
            .await
    }
}

/// The tower service every `/v1/*` request is routed to.
#[derive(Clone)]
struct GatewayService {
    inner: Arc<GatewayInner>,
}

/// Paths outside `/v1/*` name no method.
async fn unrouted(uri: http::Uri) -> http::Response<tonic::body::BoxBody> {
    let response = error_response(&DispatchError::UnknownMethod);
    middleware::log_call(uri.path(), response.status(), Duration::ZERO);
    response
}

impl<B> tower_service::Service<http::Request<B>> for GatewayService
where
    B: HttpBody + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    B::Data: Send,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = std::convert::Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            let started = std::time::Instant::now();
            let path = req.uri().path().to_string();

            let response = match inner.handle(req).await {
                Ok(json) => json_response(json),
                Err(err) => {
                    if let DispatchError::Internal(detail) = &err {
                        tracing::error!(path = %path, "Response encoding failed: {}", detail);
                    }
                    error_response(&err)
                }
            };

            middleware::log_call(&path, response.status(), started.elapsed());
            Ok(response)
        })
    }
}

/// Collect the body of an HTTP request into bytes.
async fn collect_body<B>(body: B) -> Result<Vec<u8>, String>
where
    B: HttpBody + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    B::Data: Send,
{
    match body.collect().await {
        Ok(collected) => Ok(collected.to_bytes().to_vec()),
        Err(e) => {
            let err: Box<dyn std::error::Error + Send + Sync> = e.into();
            Err(err.to_string())
        }
    }
}

fn boxed_body(bytes: Vec<u8>) -> tonic::body::BoxBody {
    tonic::body::BoxBody::new(
        http_body_util::Full::new(bytes::Bytes::from(bytes))
            .map_err(|e| Status::internal(format!("body error: {}", e))),
    )
}

/// 200 with a JSON body.
fn json_response(json: Vec<u8>) -> http::Response<tonic::body::BoxBody> {
    let mut response = http::Response::new(boxed_body(json));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Transport failure with a short plain-text reason.
fn error_response(err: &DispatchError) -> http::Response<tonic::body::BoxBody> {
    let mut response = http::Response::new(boxed_body(err.to_string().into_bytes()));
    *response.status_mut() = err.status_code();
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    if err.status_code() == StatusCode::METHOD_NOT_ALLOWED {
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("POST"));
    }
    response
}
