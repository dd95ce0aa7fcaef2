// crates/kjvonly-store/src/lib.rs
//
// kjvonly-store: Collaborator adapters for the kjvonly gateway.
//
// Provides the in-memory document store that backs user management and
// credential checks, the Elasticsearch SQL client used by Bible search,
// and the seed loader that populates the user store at startup.

pub mod elastic;
pub mod memory;
pub mod seed;

// Re-export key types for ergonomic access from downstream crates.
pub use elastic::ElasticsearchClient;
pub use memory::MemoryUserStore;
pub use seed::{load_seed_file, seed_users, SeedError, SeedUser};
