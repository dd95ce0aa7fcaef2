// crates/kjvonly-daemon/src/main.rs
//
// Binary entrypoint for the kjvonly gateway.
//
// Parses CLI arguments, loads configuration, initializes tracing, assembles
// the dispatcher (keys, users, search engine, services), and serves RPC
// until Ctrl-C.

mod config;
mod gateway;

use clap::Parser;
use config::{ConfigError, GatewayConfig};

use kjvonly_rpc::GatewayServer;

/// kjvonly gateway: authenticated JSON-RPC over HTTP for user management
/// and Bible search.
#[derive(Parser, Debug)]
#[command(name = "kjvonly-daemon", version = "0.1.0", about = "kjvonly RPC gateway")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.kjvonly/config.toml")]
    config: String,

    /// Host to bind the RPC server to.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind the RPC server to.
    #[arg(long)]
    port: Option<u16>,

    /// Elasticsearch base URL.
    #[arg(long)]
    es_url: Option<String>,

    /// Directory holding token keys.
    #[arg(long)]
    key_dir: Option<String>,

    /// JSON file of users to create at startup.
    #[arg(long)]
    seed: Option<String>,
}

impl Args {
    /// Flags win over values from the config file.
    fn apply(&self, config: &mut GatewayConfig) {
        if let Some(host) = &self.host {
            config.rpc_host = host.clone();
        }
        if let Some(port) = self.port {
            config.rpc_port = port;
        }
        if let Some(url) = &self.es_url {
            config.elasticsearch_url = url.clone();
        }
        if let Some(dir) = &self.key_dir {
            config.key_dir = dir.clone();
        }
        if let Some(seed) = &self.seed {
            config.seed_path = Some(seed.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // The config file is read before tracing starts so its log level can
    // serve as the fallback filter; load problems are reported after.
    let loaded = GatewayConfig::load(&args.config);
    let mut gateway_config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => GatewayConfig::default(),
    };
    args.apply(&mut gateway_config);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&gateway_config.log_level)),
        )
        .init();

    match loaded {
        Ok(_) => tracing::info!("Loaded configuration from {}", args.config),
        Err(ConfigError::NotFound(path)) => {
            tracing::warn!("Config file {} not found. Using defaults.", path);
        }
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    }
    gateway_config.validate()?;

    tracing::info!("kjvonly gateway v0.1.0");
    tracing::info!(
        "RPC endpoint: {}:{}",
        gateway_config.rpc_host,
        gateway_config.rpc_port
    );

    let dispatcher = match gateway::assemble(&gateway_config, chrono::Utc::now()).await {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            return Err(e.into());
        }
    };

    let server = GatewayServer::new(gateway_config.rpc_config(), dispatcher);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl-C, shutting down...");
    };

    if let Err(e) = server.start(shutdown).await {
        tracing::error!("RPC server error: {}", e);
        let e: Box<dyn std::error::Error> = e;
        return Err(e);
    }

    tracing::info!("kjvonly gateway shut down gracefully");
    Ok(())
}
