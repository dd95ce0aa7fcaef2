// crates/kjvonly-core/src/lib.rs
//
// kjvonly-core: Core types, traits, and request context for the kjvonly gateway.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines roles and claims, the per-call request context, the domain
// models handled by the RPC services, and the collaborator traits that the
// storage and search adapters implement.

pub mod claims;
pub mod clock;
pub mod context;
pub mod error;
pub mod role;
pub mod search;
pub mod traits;
pub mod user;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use kjvonly_core::Claims;`

// Identity and authorization
pub use claims::Claims;
pub use role::{Role, RoleParseError};

// Per-call state
pub use clock::{Clock, FixedClock, SystemClock};
pub use context::RequestContext;

// Domain models
pub use search::{Column, SqlResult};
pub use user::{NewUser, UpdateUser, User};

// Error types
pub use error::{SearchError, StoreError};

// Traits
pub use traits::{SearchEngine, UserStore};
