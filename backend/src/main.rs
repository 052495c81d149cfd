use std::sync::Arc;

use backend::config::{Config, StoreKind};
use backend::store::{MemoryStore, RedisStore, SharedStore};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::from_env()?;

    let store: SharedStore = match config.store {
        StoreKind::Redis => {
            let store = RedisStore::connect(&config.redis_url, &config.collection)
                .await
                .map_err(|e| {
                    tracing::error!(redis_url = %config.redis_url, error = %e, "failed to connect to Redis");
                    e
                })?;
            tracing::info!(redis_url = %config.redis_url, collection = %config.collection, "connected to Redis");
            Arc::new(store)
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory store, todos are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "server running");
    backend::run(listener, store).await?;

    Ok(())
}
