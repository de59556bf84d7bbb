use std::net::SocketAddr;
use std::sync::Arc;

use temperature_ingest::{
    api, db,
    repositories::{PgReadingRepository, ReadingRepository, UnconfiguredReadingRepository},
    services::ReadingService,
    Config,
};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Starting temperature-ingest");

    let cfg_path = std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/config.yaml".into());
    let cfg = Config::load(&cfg_path)?;
    info!(path = %cfg_path, table = %cfg.database.table, "Configuration loaded");

    let repository = init_repository(&cfg).await;
    let service = ReadingService::from_config(repository, &cfg)?;
    let router = api::create_router(service);

    let addr = cfg.api_bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    info!("API server listening on {}", addr);

    let serve = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    );
    if let Err(e) = serve.with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "API server error");
    }

    info!("Application shutdown complete");
    Ok(())
}

/// Storage problems at boot are logged, not fatal: the liveness routes stay up
/// and store-backed requests report the failure themselves.
async fn init_repository(cfg: &Config) -> Arc<dyn ReadingRepository> {
    let Some(url) = cfg.database_url() else {
        error!(
            severity = "critical",
            "DATABASE_URL is not set; readings cannot be stored or listed"
        );
        return Arc::new(UnconfiguredReadingRepository::missing_url());
    };

    let repository = match db::connect_lazy(url, &cfg.database)
        .and_then(|pool| PgReadingRepository::new(pool, cfg.database.table.clone()))
    {
        Ok(repository) => repository,
        Err(e) => {
            error!(severity = "critical", error = %e, "Invalid database configuration");
            return Arc::new(UnconfiguredReadingRepository::new(format!(
                "invalid database configuration: {}",
                e
            )));
        }
    };

    match db::ping(repository.pool()).await {
        Ok(()) => {
            info!("Connected to database");
            match repository.ensure_schema().await {
                Ok(()) => info!("Readings table ready"),
                Err(e) => warn!(error = %e, "Could not prepare readings table; retrying on first request"),
            }
        }
        Err(e) => error!(
            severity = "critical",
            error = %e,
            "Database unreachable at startup; requests will fail until it recovers"
        ),
    }

    Arc::new(repository)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
