// crates/kjvonly-rpc/src/handlers/mod.rs
//
// RPC services mounted on the gateway.
// Each module defines request/response types, the service struct, and its
// `RpcService` registration.

pub mod bible;
pub mod user;

pub use bible::BibleSearchService;
pub use user::UserService;
