// File: agent/src/main.rs
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use domain_agent::schema::{parse_collection_list, Collection};
use domain_agent::{router, AppState, TenantStore};

const DEFAULT_BIND: &str = "0.0.0.0:8745";
const DEFAULT_DATABASE: &str = "data/domain.db";
const DEVELOPMENT_SECRET: &str = "default-development-secret";

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("domain_agent=info".parse()?)
        .add_directive("tower_http=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("sqlx=warn".parse()?);

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let bind = std::env::var("AGENT_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let database = std::env::var("AGENT_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string());

    let collections = match std::env::var("AGENT_COLLECTIONS") {
        Ok(list) => parse_collection_list(&list)
            .map_err(anyhow::Error::msg)
            .context("Invalid AGENT_COLLECTIONS")?,
        Err(_) => Collection::ALL.to_vec(),
    };

    let internal_secret =
        std::env::var("INTERNAL_SECRET").unwrap_or_else(|_| DEVELOPMENT_SECRET.to_string());
    if internal_secret == DEVELOPMENT_SECRET {
        warn!("Using default development internal secret - set INTERNAL_SECRET environment variable for production");
    }

    info!("Starting domain agent on {}", bind);

    let store = TenantStore::open(&database, &collections)
        .await
        .with_context(|| format!("Failed to open store at {}", database))?;

    let app = router(Arc::new(AppState {
        internal_secret,
        store,
    }));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Domain agent listening on {}", bind);

    axum::serve(listener, app).await?;
    Ok(())
}
