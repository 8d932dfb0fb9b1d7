//! Cache Proxy - A read-through caching proxy for Redis lookups
//!
//! Answers `GET key` requests from an in-memory LRU cache with TTL expiry,
//! falling back to the backing Redis over RESP on a miss.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_proxy::api::{create_router, AppState};
use cache_proxy::cache::{self, CacheStore};
use cache_proxy::{BackendClient, Config, ProxyServer};

/// Main entry point for the cache proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Create the cache store
/// 4. Open the backend connection pool
/// 5. Optionally start the admin HTTP server
/// 6. Serve clients until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cache proxy");

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        "Configuration loaded: backend={}, listen={}, capacity={}, ttl={}s, timeout={}s, pool={}",
        config.backend_addr(),
        config.listen_addr(),
        config.cache_capacity,
        config.cache_ttl_secs,
        config.backend_timeout_secs,
        config.backend_pool_size
    );

    let store = CacheStore::new(config.cache_capacity, config.cache_ttl()?)?;
    let cache = cache::shared(store);

    let backend = BackendClient::connect(
        config.backend_addr(),
        config.backend_pool_size,
        config.backend_timeout()?,
    )
    .await
    .with_context(|| format!("failed to connect to backend at {}", config.backend_addr()))?;

    if let Some(port) = config.admin_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind admin listener on {}", addr))?;
        let app = create_router(AppState::new(cache.clone()));
        info!("Admin API listening on http://{}", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Admin API stopped: {}", e);
            }
        });
    }

    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("failed to bind client listener on {}", config.listen_addr()))?;

    let server = ProxyServer::new(cache, Arc::new(backend), config.max_line_length);
    server.run(listener, shutdown_signal()).await?;

    info!("Cache proxy shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
