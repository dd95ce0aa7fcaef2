// crates/kjvonly-rpc/src/lib.rs
//
// kjvonly-rpc: HTTP JSON-RPC gateway for kjvonly.
//
// Provides the service registry that maps `{Service}.{Method}` to typed
// handlers, the dispatcher that authenticates and authorizes each call, the
// tonic-based HTTP server that feeds it, and the UserService and
// BibleSearchService handlers.

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod registry;
pub mod server;

// Re-export key types for ergonomic access from downstream crates.
pub use dispatch::{authorize, CallSignal, Dispatcher};
pub use error::{DispatchError, RegistryError};
pub use registry::{Endpoint, RegistryBuilder, RpcService, ServiceRegistry};
pub use server::{GatewayServer, RpcConfig};
