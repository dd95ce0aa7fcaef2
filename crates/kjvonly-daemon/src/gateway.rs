// crates/kjvonly-daemon/src/gateway.rs
//
// Startup assembly: turns a GatewayConfig into a ready Dispatcher.
//
// Loads the token keys, seeds the in-memory user store, connects the
// search engine, and mounts UserService and BibleSearchService into the
// registry. Every failure here is fatal to startup.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use kjvonly_auth::{KeyStore, KeyStoreError, TokenService};
use kjvonly_rpc::handlers::{BibleSearchService, UserService};
use kjvonly_rpc::{Dispatcher, RegistryError, ServiceRegistry};
use kjvonly_store::{load_seed_file, seed_users, ElasticsearchClient, MemoryUserStore, SeedError};

use crate::config::GatewayConfig;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("key store: {0}")]
    Keys(#[from] KeyStoreError),

    #[error("seed users: {0}")]
    Seed(#[from] SeedError),

    #[error("service registry: {0}")]
    Registry(#[from] RegistryError),
}

/// Build the dispatcher the gateway serves.
pub async fn assemble(config: &GatewayConfig, now: DateTime<Utc>) -> Result<Arc<Dispatcher>, StartupError> {
    let key_dir = config.key_dir_path();
    let keys = KeyStore::load_dir(&key_dir, config.active_kid.as_deref())?;
    tracing::info!(
        "Loaded {} token keys from {} (active: {})",
        keys.len(),
        key_dir.display(),
        keys.active_kid()
    );
    let tokens = Arc::new(TokenService::new(
        keys,
        config.issuer.clone(),
        config.session_lifetime(),
    ));
    tracing::info!(
        "Issuing session tokens as {:?} valid for {}s",
        tokens.issuer(),
        config.session_lifetime_secs
    );

    let store = Arc::new(MemoryUserStore::new());
    match config.seed_file_path() {
        Some(path) => {
            let entries = load_seed_file(&path)?;
            let created = seed_users(store.as_ref(), entries, now).await?;
            tracing::info!("Seeded {} users from {}", created, path.display());
        }
        None => {
            tracing::warn!("No seed_path configured; the user store starts empty");
        }
    }

    let search = Arc::new(ElasticsearchClient::new(&config.elasticsearch_url));
    tracing::info!("Bible search backed by {}", config.elasticsearch_url);

    let mut builder = ServiceRegistry::builder();
    builder
        .mount(Arc::new(UserService::new(store, tokens.clone())))?
        .mount(Arc::new(BibleSearchService::new(search)))?;
    let registry = Arc::new(builder.build());

    Ok(Arc::new(Dispatcher::new(registry, tokens)))
}
