use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use rbac_admin_api::auth::{Argon2Hasher, JwtKeys};
use rbac_admin_api::config::AppConfig;
use rbac_admin_api::database::DatabaseManager;
use rbac_admin_api::store::{MemoryStore, PostgresStore, RbacStore};
use rbac_admin_api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env()?;

    let default_filter = if config.is_development() {
        "info,rbac_admin_api=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    tracing::info!("Starting RBAC admin API in {:?} mode", config.environment);

    let store: Arc<dyn RbacStore> = match config.database.url {
        Some(_) => {
            let manager = DatabaseManager::connect(&config.database).await?;
            if config.database.run_migrations {
                manager.migrate().await?;
            }
            Arc::new(PostgresStore::new(manager.pool()))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store (data is lost on exit)");
            Arc::new(MemoryStore::new())
        }
    };

    let hasher = Arc::new(Argon2Hasher::new());
    let jwt = JwtKeys::from_config(&config.security)?;
    let port = config.api.port;

    let app = build_router(AppState::new(store, hasher, jwt, config));

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("RBAC admin API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
