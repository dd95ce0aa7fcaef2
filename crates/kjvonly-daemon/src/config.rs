// crates/kjvonly-daemon/src/config.rs
//
// Runtime configuration for the kjvonly gateway.
// Loaded from a TOML file or populated with defaults; command-line flags
// override individual fields.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use kjvonly_rpc::RpcConfig;

/// Longest session a token may be issued for (30 days).
pub const MAX_SESSION_LIFETIME_SECS: i64 = 30 * 24 * 60 * 60;

/// Longest per-request deadline (one hour).
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {0} not found")]
    NotFound(String),

    #[error("cannot read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("invalid config file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Runtime configuration for the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Host address for the RPC server.
    #[serde(default = "default_rpc_host")]
    pub rpc_host: String,

    /// Port for the RPC server.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Directory holding `<kid>.key` and `<kid>.pub` token keys.
    #[serde(default = "default_key_dir")]
    pub key_dir: String,

    /// Key id to sign with. When unset the newest signing key is used.
    #[serde(default)]
    pub active_kid: Option<String>,

    /// `iss` claim stamped into issued tokens.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    #[serde(default = "default_session_lifetime_secs")]
    pub session_lifetime_secs: i64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Base URL of the Elasticsearch cluster serving Bible search.
    #[serde(default = "default_elasticsearch_url")]
    pub elasticsearch_url: String,

    /// JSON file of users created at startup.
    #[serde(default)]
    pub seed_path: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_rpc_host() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    8080
}

fn default_key_dir() -> String {
    "~/.kjvonly/keys".to_string()
}

fn default_issuer() -> String {
    "kjvonly".to_string()
}

fn default_session_lifetime_secs() -> i64 {
    kjvonly_auth::DEFAULT_LIFETIME_SECS
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_elasticsearch_url() -> String {
    "http://127.0.0.1:9200".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            rpc_host: default_rpc_host(),
            rpc_port: default_rpc_port(),
            key_dir: default_key_dir(),
            active_kid: None,
            issuer: default_issuer(),
            session_lifetime_secs: default_session_lifetime_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            elasticsearch_url: default_elasticsearch_url(),
            seed_path: None,
            log_level: default_log_level(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// A missing file is reported as `ConfigError::NotFound` so the caller
    /// can fall back to defaults; unreadable or malformed files are errors.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let resolved = expand_tilde(path);
        let contents = match fs::read_to_string(&resolved) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(resolved));
            }
            Err(e) => {
                return Err(ConfigError::Io {
                    path: resolved,
                    reason: e.to_string(),
                })
            }
        };
        let config: GatewayConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: resolved,
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the gateway cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_lifetime_secs <= 0 {
            return Err(ConfigError::Invalid {
                field: "session_lifetime_secs",
                reason: "must be positive".to_string(),
            });
        }
        if self.session_lifetime_secs > MAX_SESSION_LIFETIME_SECS {
            return Err(ConfigError::Invalid {
                field: "session_lifetime_secs",
                reason: format!("must be at most {}", MAX_SESSION_LIFETIME_SECS),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_secs",
                reason: "must be positive".to_string(),
            });
        }
        if self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(ConfigError::Invalid {
                field: "request_timeout_secs",
                reason: format!("must be at most {}", MAX_REQUEST_TIMEOUT_SECS),
            });
        }
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "issuer",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn key_dir_path(&self) -> PathBuf {
        PathBuf::from(expand_tilde(&self.key_dir))
    }

    pub fn seed_file_path(&self) -> Option<PathBuf> {
        self.seed_path.as_deref().map(|p| PathBuf::from(expand_tilde(p)))
    }

    pub fn session_lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_lifetime_secs)
    }

    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig {
            host: self.rpc_host.clone(),
            port: self.rpc_port,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_fields_take_defaults() {
        let file = write_config("rpc_port = 9090\nseed_path = \"/srv/users.json\"\n");
        let config = GatewayConfig::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.rpc_port, 9090);
        assert_eq!(config.rpc_host, "127.0.0.1");
        assert_eq!(config.issuer, "kjvonly");
        assert_eq!(config.session_lifetime_secs, 3600);
        assert_eq!(config.elasticsearch_url, "http://127.0.0.1:9200");
        assert_eq!(config.seed_file_path(), Some(PathBuf::from("/srv/users.json")));
        assert!(config.active_kid.is_none());
    }

    #[test]
    fn rpc_config_carries_timeout() {
        let config = GatewayConfig {
            request_timeout_secs: 5,
            ..GatewayConfig::default()
        };
        let rpc = config.rpc_config();
        assert_eq!(rpc.port, 8080);
        assert_eq!(rpc.request_timeout, Duration::from_secs(5));
        assert_eq!(config.session_lifetime(), chrono::Duration::hours(1));
    }

    #[test]
    fn missing_file_is_distinguished() {
        let err = GatewayConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let file = write_config("rpc_port = \"not a number\"\n");
        let err = GatewayConfig::load(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn non_positive_lifetime_rejected() {
        let file = write_config("session_lifetime_secs = 0\n");
        let err = GatewayConfig::load(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "session_lifetime_secs",
                ..
            }
        ));
    }

    #[test]
    fn lifetime_upper_bound_enforced() {
        let at_limit = GatewayConfig {
            session_lifetime_secs: MAX_SESSION_LIFETIME_SECS,
            ..GatewayConfig::default()
        };
        assert!(at_limit.validate().is_ok());

        for secs in [MAX_SESSION_LIFETIME_SECS + 1, i64::MAX] {
            let file = write_config(&format!("session_lifetime_secs = {}\n", secs));
            let err = GatewayConfig::load(file.path().to_str().unwrap()).unwrap_err();
            assert!(
                matches!(
                    err,
                    ConfigError::Invalid {
                        field: "session_lifetime_secs",
                        ..
                    }
                ),
                "lifetime {secs}"
            );
        }
    }

    #[test]
    fn timeout_bounds_enforced() {
        let at_limit = GatewayConfig {
            request_timeout_secs: MAX_REQUEST_TIMEOUT_SECS,
            ..GatewayConfig::default()
        };
        assert!(at_limit.validate().is_ok());

        for secs in [0, MAX_REQUEST_TIMEOUT_SECS + 1, i64::MAX as u64] {
            let file = write_config(&format!("request_timeout_secs = {}\n", secs));
            let err = GatewayConfig::load(file.path().to_str().unwrap()).unwrap_err();
            assert!(
                matches!(
                    err,
                    ConfigError::Invalid {
                        field: "request_timeout_secs",
                        ..
                    }
                ),
                "timeout {secs}"
            );
        }
    }

    #[test]
    fn tilde_expansion_leaves_absolute_paths() {
        assert_eq!(expand_tilde("/etc/kjvonly"), "/etc/kjvonly");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_tilde("~/keys"),
                format!("{}/keys", home.display())
            );
        }
    }
}
