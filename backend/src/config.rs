use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:7070";
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";
const DEFAULT_COLLECTION: &str = "todoapp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Redis,
    Memory,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreKind::Redis),
            "memory" => Ok(StoreKind::Memory),
            other => Err(ConfigError::UnknownStore(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid BIND_ADDR {0:?}")]
    BindAddr(String),
    #[error("unknown TODO_STORE {0:?}, expected \"redis\" or \"memory\"")]
    UnknownStore(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub redis_url: String,
    pub collection: String,
    pub store: StoreKind,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source; unset keys fall
    /// back to the defaults.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|_| ConfigError::BindAddr(bind_addr))?;

        let store = match var("TODO_STORE") {
            Some(kind) => kind.parse()?,
            None => StoreKind::Redis,
        };

        Ok(Config {
            bind_addr,
            redis_url: var("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            collection: var("TODO_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_fixed_deployment() {
        let config = config_with(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 7070);
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379/0");
        assert_eq!(config.collection, "todoapp");
        assert_eq!(config.store, StoreKind::Redis);
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_with(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("REDIS_URL", "redis://cache:6380/2"),
            ("TODO_COLLECTION", "todos"),
            ("TODO_STORE", "Memory"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.redis_url, "redis://cache:6380/2");
        assert_eq!(config.collection, "todos");
        assert_eq!(config.store, StoreKind::Memory);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config_with(&[("BIND_ADDR", "nowhere")]),
            Err(ConfigError::BindAddr(_))
        ));
        assert!(matches!(
            config_with(&[("TODO_STORE", "mongo")]),
            Err(ConfigError::UnknownStore(_))
        ));
    }
}
