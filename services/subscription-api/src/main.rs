//! Tiffin Subscription API server
//!
//! See the library crate for the route map.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tiffin_db::pg::Repositories;
use tiffin_db::PoolOptions;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use subscription_api::build_router;
use subscription_api::config::Config;
use subscription_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("subscription_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Tiffin Subscription API");

    let config = Config::from_env()?;
    tracing::info!(config = ?config, "Configuration loaded");

    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    let pool = tiffin_db::create_pool_with_options(
        &config.database_url,
        &PoolOptions {
            max_connections: config.db_max_connections,
            ..PoolOptions::default()
        },
    )
    .await?;
    tracing::info!("Database pool created");

    tiffin_db::migrate(&pool).await?;

    let repos = Repositories::new(pool.clone());
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(repos, pool, config);

    let app = build_router(state, metrics_handle);

    tracing::info!("HTTP server listening on {}", http_addr);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Lifecycle ops are a handful of queries; gateway calls dominate the tail
    let lifecycle_latency_buckets = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("lifecycle_operation_duration_seconds".to_string()),
            lifecycle_latency_buckets,
        )?
        .install_recorder()?;

    metrics::describe_counter!(
        "lifecycle_transitions_total",
        "Subscription state transitions by action"
    );
    metrics::describe_counter!("skips_applied_total", "Customer skips applied by slot");
    metrics::describe_counter!("credits_minted_total", "Credits issued by source");
    metrics::describe_counter!(
        "webhooks_processed_total",
        "Razorpay webhooks processed by status"
    );
    metrics::describe_counter!(
        "lifecycle_operation_errors_total",
        "Failed operations by operation"
    );
    metrics::describe_histogram!(
        "lifecycle_operation_duration_seconds",
        "Lifecycle operation latency in seconds by operation"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
