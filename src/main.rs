use energy_trends_api::{
    api,
    config::StoreBackend,
    db,
    repositories::{InMemoryUsageStore, PgUsageRepository, UsageStore},
    Config,
};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cfg_path = std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/config.yaml".into());
    let cfg = Config::load(&cfg_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Starting energy-trends-api");
    info!(config = %cfg_path, backend = ?cfg.store.backend, "Configuration loaded");

    let offset = cfg.reporting.offset()?;
    let store: Arc<dyn UsageStore> = match cfg.store.backend {
        StoreBackend::Postgres => {
            let db_cfg = cfg
                .database
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("database section is required for postgres"))?;
            let pool = db::connect(db_cfg).await?;
            sqlx::query("SELECT 1").execute(&pool).await?;
            info!("Connected to database");

            let repository = PgUsageRepository::new(pool, offset);
            repository.ensure_schema().await?;
            Arc::new(repository)
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; samples are lost on restart");
            Arc::new(InMemoryUsageStore::new(offset))
        }
    };

    let router = api::create_router(api::AppState::new(store, offset));
    let addr = cfg.bind_address();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    info!("API server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Application shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
