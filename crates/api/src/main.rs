//! Single binary entry point (§4.9): `--server` runs the HTTP API,
//! `--worker=eventMapping` / `--worker=dispatcher` run the two consumer
//! pools, `--setup` runs migrations, `--new-api-key` mints an API key.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use zebrahook_common::crypto::{generate_api_key, hash_api_key};
use zebrahook_config::Config;

#[derive(Debug, Parser)]
#[command(name = "zebrahook", about = "Managed webhook delivery service")]
struct Cli {
    /// Run the HTTP API server.
    #[arg(long)]
    server: bool,

    /// Run a background worker pool: `eventMapping` or `dispatcher`.
    #[arg(long)]
    worker: Option<String>,

    /// Run pending database migrations and exit.
    #[arg(long)]
    setup: bool,

    /// Mint a new API key with the given description and exit.
    #[arg(long = "new-api-key")]
    new_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("failed to load configuration")?;

    match config.observability.log_format {
        zebrahook_config::LogFormat::Json => zebrahook_common::init_tracing_json(),
        zebrahook_config::LogFormat::Compact => zebrahook_common::init_tracing(),
    }

    let pool = zebrahook_common::create_pool(&config.database.dsn, config.database.max_connections)
        .await
        .context("failed to connect to database")?;

    if cli.setup {
        return run_setup(&pool).await;
    }

    if let Some(description) = cli.new_api_key {
        return run_new_api_key(&pool, description).await;
    }

    if let Some(worker) = cli.worker {
        return run_worker(&worker, pool, config).await;
    }

    if cli.server {
        return run_server(pool, config).await;
    }

    bail!("no command given: pass one of --server, --worker=<name>, --setup, --new-api-key=<description>");
}

async fn run_setup(pool: &sqlx::PgPool) -> Result<()> {
    info!("running database migrations");
    match sqlx::migrate!("../../migrations").run(pool).await {
        Ok(_) => info!("migrations applied"),
        Err(sqlx::migrate::MigrateError::VersionMissing(_)) => {
            info!("migrations already applied, skipping");
        }
        Err(e) => {
            if !e.to_string().contains("already exists") {
                return Err(e.into());
            }
            info!("migrations already applied, skipping");
        }
    }
    Ok(())
}

async fn run_new_api_key(pool: &sqlx::PgPool, description: String) -> Result<()> {
    let clear_key = generate_api_key();
    let hash = hash_api_key(&clear_key);

    sqlx::query(
        r#"
        INSERT INTO api_keys (hash, description, status, created_at, updated_at)
        VALUES ($1, $2, 'enabled', now(), now())
        "#,
    )
    .bind(&hash)
    .bind(&description)
    .execute(pool)
    .await
    .context("failed to persist new api key")?;

    println!("{clear_key}");
    Ok(())
}

async fn run_worker(worker: &str, pool: sqlx::PgPool, config: Config) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = zebrahook_queue::shutdown_channel();

    let handles = match worker {
        "eventMapping" => {
            info!("starting event_mapping worker pool");
            zebrahook_fanout_worker::spawn_consumers(
                pool,
                config.worker.event_mapping_parallel_jobs,
                config.worker.polling_interval_for("eventMapping"),
                config.backoff.clone(),
                shutdown_rx,
            )
        }
        "dispatcher" => {
            info!("starting dispatcher worker pool");
            let encryption_key =
                zebrahook_common::crypto::EncryptionKey::from_config_bytes(&config.encryption_key)?;
            let mut handles = zebrahook_delivery_worker::spawn_consumers(
                pool.clone(),
                config.worker.dispatcher_parallel_jobs,
                config.worker.polling_interval_for("dispatcher"),
                config.backoff.clone(),
                config.webhook_request.clone(),
                encryption_key,
                shutdown_rx.clone(),
            )?;
            handles.push(zebrahook_delivery_worker::spawn_sweep(
                pool,
                config.recovery_sweep.interval_secs,
                config.recovery_sweep.stale_after_secs,
                shutdown_rx,
            ));
            handles
        }
        other => bail!("unknown worker name {other:?}, expected eventMapping or dispatcher"),
    };

    shutdown_signal().await;
    info!("shutdown signal received, waiting for workers to finish in-flight jobs");
    let _ = shutdown_tx.send(true);
    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}

async fn run_server(pool: sqlx::PgPool, config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let metrics_addr = format!("{}:{}", config.server.host, config.observability.metrics_port);

    let state = zebrahook_api::state::AppState { pool, config };
    let app = zebrahook_api::router(state);

    let metrics_app = axum::Router::new().route(
        "/metrics",
        axum::routing::get(|| async {
            zebrahook_api::metrics::render_metrics()
                .map_err(|e| (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }),
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr).await?;

    info!("api server listening on {addr}");
    info!("metrics server listening on {metrics_addr}");

    tokio::select! {
        res = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()) => res?,
        res = axum::serve(metrics_listener, metrics_app).with_graceful_shutdown(shutdown_signal()) => res?,
    }

    info!("api server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
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
        _ = ctrl_c => warn!("received ctrl-c, shutting down..."),
        _ = terminate => warn!("received terminate signal, shutting down..."),
    }
}
