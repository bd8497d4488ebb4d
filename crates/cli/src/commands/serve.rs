//! `bia serve` — Start the HTTP gateway server.
//!
//! The storage backend is selected exactly once, here: a reachable
//! `DATABASE_URL` gives the Postgres backend, otherwise the volatile
//! in-memory store. A set-but-unreachable database aborts startup
//! rather than silently downgrading durability.

use std::sync::Arc;

use tracing::warn;

use bia_config::AppConfig;
use bia_core::provider::Provider;
use bia_core::storage::Storage;
use bia_providers::OpenAiCompatProvider;
use bia_storage::InMemoryStore;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let storage: Arc<dyn Storage> = match config.database_url.as_deref() {
        Some(url) => {
            let store = bia_storage::PostgresStore::connect(url)
                .await
                .map_err(|e| format!("DATABASE_URL is set but unusable: {e}"))?;
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set; chat history is volatile and lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let provider: Arc<dyn Provider> =
        Arc::new(OpenAiCompatProvider::openai(config.openai_api_key.clone()));

    let port = port_override.unwrap_or(config.gateway.port);
    println!("Bia gateway");
    println!("  Listening: {}:{}", config.gateway.host, port);
    println!("  Storage:   {}", storage.name());
    println!("  Model:     {}", config.model);

    bia_gateway::start(config, storage, provider, port_override).await?;

    Ok(())
}
