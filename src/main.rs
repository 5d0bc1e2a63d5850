//! Stayfinder Marketplace API
//!
//! A listings-and-reviews marketplace backend: cookie-session accounts,
//! owner-gated CRUD on property listings, and per-listing reviews kept
//! consistent without multi-document transactions.

use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stayfinder::{
    routes, seed, AppState, Config, DiskMediaStore, InMemoryListingStore, InMemoryReviewStore,
    InMemorySessionStore, InMemoryUserStore, SqliteStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stayfinder=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!(?config, "Loaded configuration");

    let media_store = Arc::new(DiskMediaStore::new(&config.media_dir)?);
    let session_ttl = Duration::hours(config.session_ttl_hours);

    // Wire up the configured storage backend; the SQLite store fills all
    // four store slots at once
    let app = match &config.database_file {
        Some(path) => {
            let store = Arc::new(SqliteStore::open(path, session_ttl)?);
            if config.seed_data {
                seed::seed_if_empty(store.as_ref(), store.as_ref())?;
            }
            let state = Arc::new(AppState::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                media_store,
            ));
            routes::create_router_with_options(state, &config.media_dir, &config.cors_origin)
        }
        None => {
            let users = Arc::new(InMemoryUserStore::new());
            let listings = Arc::new(InMemoryListingStore::new());
            if config.seed_data {
                seed::seed_if_empty(users.as_ref(), listings.as_ref())?;
            }
            let state = Arc::new(AppState::new(
                users,
                Arc::new(InMemorySessionStore::new(session_ttl)),
                listings,
                Arc::new(InMemoryReviewStore::new()),
                media_store,
            ));
            routes::create_router_with_options(state, &config.media_dir, &config.cors_origin)
        }
    };

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Marketplace listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
