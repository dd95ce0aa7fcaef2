// crates/kjvonly-core/src/context.rs
//
// RequestContext: the per-call bundle handed to every handler.
//
// Carries the resolved claims, the clock reading taken when the call was
// dispatched, and the call's cancellation signal. Cancellation is
// cooperative: handlers and the adapters they call await `cancelled()` next
// to their own blocking work.

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::claims::Claims;

/// Per-call context. Owned by exactly one in-flight call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Caller identity; anonymous when no valid token was presented.
    pub claims: Claims,
    /// Wall-clock reading for this call. Use this instead of `Utc::now()`.
    pub now: DateTime<Utc>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Build a context from its parts.
    pub fn new(
        claims: Claims,
        now: DateTime<Utc>,
        cancel: CancellationToken,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            claims,
            now,
            cancel,
            deadline,
        }
    }

    /// An anonymous context that is never cancelled. Used by offline
    /// tooling (seeding) and tests.
    pub fn background(now: DateTime<Utc>) -> Self {
        Self::new(Claims::anonymous(), now, CancellationToken::new(), None)
    }

    /// The call deadline, if the transport set one.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the call was cancelled or its deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Resolves once the call is cancelled or its deadline elapses.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.cancel.cancelled().await,
        }
    }
}
