// crates/kjvonly-rpc/src/dispatch.rs
//
// Dispatcher: resolves one call against the registry and runs it.
//
// Order of checks per call:
//   1. (service, method) must be registered, before any token work
//   2. a presented bearer token is verified; any failure means anonymous
//   3. role-gated endpoints reject anonymous (401) and role-less (403) callers
//   4. the body is decoded into the handler's request type
//   5. the handler runs with a fresh RequestContext

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use kjvonly_auth::TokenService;
use kjvonly_core::{Claims, Clock, RequestContext, Role};

use crate::error::DispatchError;
use crate::registry::ServiceRegistry;

/// Cancellation and deadline the transport attaches to a call.
#[derive(Debug, Clone, Default)]
pub struct CallSignal {
    pub cancel: CancellationToken,
    pub deadline: Option<Instant>,
}

impl CallSignal {
    pub fn new(cancel: CancellationToken, deadline: Option<Instant>) -> Self {
        Self { cancel, deadline }
    }
}

/// Check `claims` against an endpoint's required roles.
pub fn authorize(required: &[Role], claims: &Claims) -> Result<(), DispatchError> {
    if required.is_empty() {
        return Ok(());
    }
    if claims.is_anonymous() {
        return Err(DispatchError::Unauthenticated);
    }
    if !claims.has_any_role(required) {
        return Err(DispatchError::Forbidden);
    }
    Ok(())
}

/// Routes calls to registered endpoints.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
    tokens: Arc<TokenService>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ServiceRegistry>, tokens: Arc<TokenService>) -> Self {
        Self { registry, tokens }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Resolve the caller's claims from an optional bearer token.
    fn resolve_claims(&self, bearer: Option<&str>, now: DateTime<Utc>) -> Claims {
        let Some(token) = bearer else {
            return Claims::anonymous();
        };
        match self.tokens.verify(token, now) {
            Ok(claims) => claims,
            Err(kind) => {
                tracing::debug!(reason = %kind, "Bearer token rejected, treating caller as anonymous");
                Claims::anonymous()
            }
        }
    }

    /// Run one call and return the encoded response body.
    pub async fn dispatch(
        &self,
        service: &str,
        method: &str,
        body: &[u8],
        bearer: Option<&str>,
        clock: &dyn Clock,
        signal: CallSignal,
    ) -> Result<Vec<u8>, DispatchError> {
        let endpoint = self
            .registry
            .lookup(service, method)
            .ok_or(DispatchError::UnknownMethod)?;

        let now = clock.now();
        let claims = self.resolve_claims(bearer, now);
        authorize(endpoint.roles(), &claims)?;

        let invocation = endpoint.decode(body)?;
        let ctx = RequestContext::new(claims, now, signal.cancel, signal.deadline);
        invocation(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use ed25519_dalek::SigningKey;
    use kjvonly_auth::{KeyStore, TokenKey};
    use kjvonly_core::FixedClock;

    use crate::registry::{Endpoint, RegistryBuilder};

    fn tokens() -> Arc<TokenService> {
        let keys = KeyStore::from_keys(
            vec![TokenKey::signing("k1", SigningKey::from_bytes(&[3u8; 32]))],
            None,
        )
        .unwrap();
        Arc::new(TokenService::new(keys, "kjvonly", Duration::hours(1)))
    }

    #[test]
    fn test_authorize_matrix() {
        let admin = Claims::for_subject("a", [Role::Admin]);
        let user = Claims::for_subject("u", [Role::User]);
        let nobody = Claims::anonymous();

        assert_eq!(authorize(&[], &nobody), Ok(()));
        assert_eq!(authorize(&[Role::Admin], &admin), Ok(()));
        assert_eq!(authorize(&[Role::Admin], &user), Err(DispatchError::Forbidden));
        assert_eq!(authorize(&[Role::Admin], &nobody), Err(DispatchError::Unauthenticated));
        assert_eq!(authorize(&[Role::Admin, Role::User], &user), Ok(()));
    }

    #[tokio::test]
    async fn test_context_carries_clock_reading() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(
                "Clock",
                "Now",
                Endpoint::new(&[], |_: serde_json::Value, ctx: RequestContext| async move {
                    ctx.now.timestamp()
                }),
            )
            .unwrap();
        let dispatcher = Dispatcher::new(Arc::new(builder.build()), tokens());
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(t0);

        let body = dispatcher
            .dispatch("Clock", "Now", b"", None, &clock, CallSignal::default())
            .await
            .unwrap();
        assert_eq!(body, t0.timestamp().to_string().into_bytes());
    }
}
