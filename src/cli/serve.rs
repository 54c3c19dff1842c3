//! Serve command implementation

use crate::admission::{
    AdmissionController, BucketStore, FailoverBucketStore, MemoryBucketStore, RedisBucketStore,
    StoreError,
};
use crate::api::{create_router, AppState};
use crate::cli::ServeArgs;
use crate::config::{LogFormat, StorageBackend, SwitchyardConfig};
use crate::routing::ModelRouter;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Load configuration with CLI overrides
pub fn load_config_with_overrides(
    args: &ServeArgs,
) -> Result<SwitchyardConfig, Box<dyn std::error::Error>> {
    let mut config = super::load_config(&args.config)?;

    // CLI overrides (highest priority)
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }
    if let Some(ref url) = args.redis_url {
        config.admission.storage.backend = StorageBackend::Redis;
        config.admission.storage.redis_url = Some(url.clone());
    }

    Ok(config)
}

/// Initialize tracing based on configuration
pub fn init_tracing(
    config: &crate::config::LoggingConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = crate::logging::build_filter_directives(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    Ok(())
}

/// Build the bucket store described by `[admission.storage]`.
///
/// An unreachable Redis at startup is not fatal: the store starts degraded
/// on the local buckets and moves back to Redis once it answers. Only a
/// malformed Redis URL is an error.
pub async fn build_store(
    config: &SwitchyardConfig,
    fallback: Arc<MemoryBucketStore>,
) -> Result<Arc<dyn BucketStore>, StoreError> {
    let storage = &config.admission.storage;

    let url = match (storage.backend, storage.redis_url.as_deref()) {
        (StorageBackend::Redis, Some(url)) => url,
        _ => {
            tracing::info!("Using in-memory rate limit storage");
            return Ok(Arc::new(FailoverBucketStore::memory_only(fallback)));
        }
    };

    let redis = RedisBucketStore::open(url, storage.timeout())?;
    let store = FailoverBucketStore::new(
        Some(Arc::new(redis)),
        fallback,
        storage.failover_cooldown(),
    );
    if store.check_primary().await {
        tracing::info!("Using Redis rate limit storage with memory fallback");
    } else {
        tracing::warn!(
            cooldown_ms = storage.failover_cooldown().as_millis() as u64,
            "Redis unreachable at startup, serving per-instance limits until it answers"
        );
    }
    Ok(Arc::new(store))
}

/// Periodically drop expired buckets from the local store until cancelled.
pub fn spawn_purge_task(
    store: Arc<MemoryBucketStore>,
    every: Duration,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    store.purge_expired();
                }
                _ = cancel_token.cancelled() => break,
            }
        }
    })
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
        _ = cancel_token.cancelled() => {}
    }

    cancel_token.cancel();
}

/// Main serve command handler
pub async fn run_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load, merge and validate configuration
    let config = load_config_with_overrides(&args)?;
    config.validate()?;

    // 2. Initialize tracing
    init_tracing(&config.logging)?;

    tracing::info!("Starting Switchyard server");
    tracing::debug!(?config, "Loaded configuration");

    // 3. Admission controller over the configured store
    let cancel_token = CancellationToken::new();
    let local = Arc::new(MemoryBucketStore::new());
    let purge_handle = spawn_purge_task(Arc::clone(&local), PURGE_INTERVAL, cancel_token.clone());
    let store = build_store(&config, local).await?;
    let controller = AdmissionController::new(store, config.admission.policy_table())
        .with_max_attempts(config.admission.max_attempts);

    // 4. Router from the validated routing section
    let router = ModelRouter::from_config(&config.routing)?;

    // 5. Bind and serve
    let state = Arc::new(AppState::new(controller, router, Arc::new(config.clone())));
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Switchyard API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token.clone()))
        .await?;

    cancel_token.cancel();
    let _ = purge_handle.await;

    tracing::info!("Switchyard server stopped");
    Ok(())
}
