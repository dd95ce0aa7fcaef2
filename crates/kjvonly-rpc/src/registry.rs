// crates/kjvonly-rpc/src/registry.rs
//
// Service registry: the immutable (service, method) -> endpoint table.
//
// Each endpoint pairs a required-role set with a typed async handler. The
// handler's request and response types are erased behind a decode step:
// decoding the body yields an `Invocation`, a prepared call that only needs
// the request context to run. The table is built once at startup and shared
// read-only by every call.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use kjvonly_core::{RequestContext, Role};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DispatchError, RegistryError};

/// Encoded response of a finished call.
pub type CallFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>, DispatchError>> + Send>>;

/// A decoded request bound to its handler, waiting for a context.
pub type Invocation = Box<dyn FnOnce(RequestContext) -> CallFuture + Send>;

type DecodeFn = dyn Fn(&[u8]) -> Result<Invocation, DispatchError> + Send + Sync;

/// One callable RPC method.
#[derive(Clone)]
pub struct Endpoint {
    roles: Vec<Role>,
    decode: Arc<DecodeFn>,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint").field("roles", &self.roles).finish()
    }
}

impl Endpoint {
    /// Wrap a typed handler. An empty `roles` list makes the endpoint public.
    pub fn new<Req, Resp, F, Fut>(roles: &[Role], handler: F) -> Self
    where
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + 'static,
        F: Fn(Req, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Resp> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let decode = move |body: &[u8]| -> Result<Invocation, DispatchError> {
            let request: Req = decode_body(body)?;
            let handler = Arc::clone(&handler);
            Ok(Box::new(move |ctx: RequestContext| -> CallFuture {
                Box::pin(async move {
                    let response = handler(request, ctx).await;
                    serde_json::to_vec(&response)
                        .map_err(|e| DispatchError::Internal(e.to_string()))
                })
            }))
        };

        Self {
            roles: roles.to_vec(),
            decode: Arc::new(decode),
        }
    }

    /// Wrap a handler method that takes its service as `Arc<S>`.
    pub fn bound<S, Req, Resp, F, Fut>(roles: &[Role], service: &Arc<S>, handler: F) -> Self
    where
        S: Send + Sync + 'static,
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + 'static,
        F: Fn(Arc<S>, Req, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Resp> + Send + 'static,
    {
        let service = Arc::clone(service);
        Self::new(roles, move |req, ctx| handler(Arc::clone(&service), req, ctx))
    }

    /// Roles of which the caller must hold at least one. Empty means public.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn is_public(&self) -> bool {
        self.roles.is_empty()
    }

    /// Decode a request body into a prepared call.
    pub fn decode(&self, body: &[u8]) -> Result<Invocation, DispatchError> {
        (self.decode)(body)
    }
}

/// Decode a JSON body. An empty (or all-whitespace) body is read as `{}`.
fn decode_body<Req: DeserializeOwned>(body: &[u8]) -> Result<Req, DispatchError> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| DispatchError::BadRequest(e.to_string()))
}

// ---------------------------------------------------------------------------
// RpcService
// ---------------------------------------------------------------------------

/// A named group of endpoints mounted under one service name.
pub trait RpcService: Send + Sync + 'static {
    /// Service name used in the URL path (`/v1/{NAME}.{Method}`).
    const NAME: &'static str;

    /// Method name and endpoint for every method the service exposes.
    fn endpoints(self: Arc<Self>) -> Vec<(&'static str, Endpoint)>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Collects endpoints during startup.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    services: HashMap<String, HashMap<String, Endpoint>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single endpoint. Fails if the pair is already taken.
    pub fn register(
        &mut self,
        service: &str,
        method: &str,
        endpoint: Endpoint,
    ) -> Result<&mut Self, RegistryError> {
        let methods = self.services.entry(service.to_string()).or_default();
        if methods.contains_key(method) {
            return Err(RegistryError::Duplicate {
                service: service.to_string(),
                method: method.to_string(),
            });
        }
        methods.insert(method.to_string(), endpoint);
        Ok(self)
    }

    /// Add every endpoint of `service` under `S::NAME`.
    pub fn mount<S: RpcService>(&mut self, service: Arc<S>) -> Result<&mut Self, RegistryError> {
        for (method, endpoint) in service.endpoints() {
            self.register(S::NAME, method, endpoint)?;
        }
        Ok(self)
    }

    /// Freeze into an immutable registry.
    pub fn build(self) -> ServiceRegistry {
        ServiceRegistry {
            services: self.services,
        }
    }
}

/// Immutable endpoint table. Lookups take no locks.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, HashMap<String, Endpoint>>,
}

impl ServiceRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn lookup(&self, service: &str, method: &str) -> Option<&Endpoint> {
        self.services.get(service)?.get(method)
    }

    /// Number of registered endpoints.
    pub fn len(&self) -> usize {
        self.services.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every `Service.Method` route, sorted.
    pub fn routes(&self) -> Vec<String> {
        let mut routes: Vec<String> = self
            .services
            .iter()
            .flat_map(|(service, methods)| {
                methods.keys().map(move |method| format!("{service}.{method}"))
            })
            .collect();
        routes.sort();
        routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Echo {
        #[serde(default)]
        text: String,
    }

    #[derive(Serialize)]
    struct EchoReply {
        text: String,
        anonymous: bool,
    }

    fn echo_endpoint(roles: &[Role]) -> Endpoint {
        Endpoint::new(roles, |req: Echo, ctx: RequestContext| async move {
            EchoReply {
                text: req.text,
                anonymous: ctx.claims.is_anonymous(),
            }
        })
    }

    async fn run(endpoint: &Endpoint, body: &[u8]) -> Result<serde_json::Value, DispatchError> {
        let invocation = endpoint.decode(body)?;
        let bytes = invocation(RequestContext::background(Utc::now())).await?;
        Ok(serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_endpoint_decodes_and_runs() {
        let endpoint = echo_endpoint(&[]);
        let reply = run(&endpoint, br#"{"text":"in the beginning"}"#).await.unwrap();
        assert_eq!(reply["text"], "in the beginning");
        assert_eq!(reply["anonymous"], true);
        assert!(endpoint.is_public());
    }

    #[tokio::test]
    async fn test_empty_body_is_empty_object() {
        let endpoint = echo_endpoint(&[]);
        let reply = run(&endpoint, b"").await.unwrap();
        assert_eq!(reply["text"], "");
        let reply = run(&endpoint, b"  \n").await.unwrap();
        assert_eq!(reply["text"], "");
    }

    #[test]
    fn test_bad_body_is_bad_request() {
        let endpoint = echo_endpoint(&[]);
        assert!(matches!(
            endpoint.decode(b"{not json"),
            Err(DispatchError::BadRequest(_))
        ));
        assert!(matches!(
            endpoint.decode(br#"{"text": 42}"#),
            Err(DispatchError::BadRequest(_))
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut builder = RegistryBuilder::new();
        builder
            .register("Echo", "Say", echo_endpoint(&[]))
            .unwrap()
            .register("Echo", "Shout", echo_endpoint(&[Role::Admin]))
            .unwrap();
        let err = builder
            .register("Echo", "Say", echo_endpoint(&[]))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                service: "Echo".to_string(),
                method: "Say".to_string()
            }
        );

        let registry = builder.build();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.routes(), vec!["Echo.Say", "Echo.Shout"]);
        assert_eq!(registry.lookup("Echo", "Shout").unwrap().roles(), &[Role::Admin]);
        assert!(registry.lookup("Echo", "Whisper").is_none());
        assert!(registry.lookup("Other", "Say").is_none());
    }

    struct Psalms;

    impl Psalms {
        async fn read(self: Arc<Self>, req: Echo, _ctx: RequestContext) -> EchoReply {
            EchoReply {
                text: format!("psalm {}", req.text),
                anonymous: true,
            }
        }
    }

    impl RpcService for Psalms {
        const NAME: &'static str = "Psalms";

        fn endpoints(self: Arc<Self>) -> Vec<(&'static str, Endpoint)> {
            vec![("Read", Endpoint::bound(&[], &self, Psalms::read))]
        }
    }

    #[tokio::test]
    async fn test_mount_service() {
        let mut builder = ServiceRegistry::builder();
        builder.mount(Arc::new(Psalms)).unwrap();
        assert!(builder.mount(Arc::new(Psalms)).is_err());
        let registry = builder.build();

        let endpoint = registry.lookup("Psalms", "Read").unwrap();
        let reply = run(endpoint, br#"{"text":"23"}"#).await.unwrap();
        assert_eq!(reply["text"], "psalm 23");
    }
}
