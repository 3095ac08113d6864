//! Delivery consumer library (C6) plus the recovery sweep (§7).
//!
//! No binary of its own — `zebrahook-api`'s `main` (per §4.9) spawns
//! [`spawn_consumers`] for `--worker=dispatcher` and [`spawn_sweep`]
//! alongside it.

pub mod backoff;
pub mod delivery;
pub mod sweep;
pub mod worker;

use rand::Rng;
use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use zebrahook_common::crypto::EncryptionKey;
use zebrahook_config::{BackoffConfig, PollingInterval, WebhookRequestConfig};
use zebrahook_queue::Queue;

pub use delivery::Sender;
pub use worker::{handle_webhook_delivery_job, QUEUE_NAME};

/// Spawn `count` delivery consumer tasks against `pool`.
pub fn spawn_consumers(
    pool: PgPool,
    count: u32,
    polling_interval: PollingInterval,
    backoff: BackoffConfig,
    webhook_request: WebhookRequestConfig,
    encryption_key: EncryptionKey,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<Vec<JoinHandle<()>>> {
    let sender = Sender::new(
        webhook_request.timeout,
        webhook_request.user_agent.clone(),
        webhook_request.signature_header_name.clone(),
    )?;
    let queue = Queue::new(pool);

    let handles = (0..count)
        .map(|worker_id| {
            let queue = queue.clone();
            let backoff = backoff.clone();
            let sender = sender.clone();
            let encryption_key = encryption_key.clone();
            let shutdown = shutdown.clone();
            let interval = polling_interval.clone();

            tokio::spawn(async move {
                tracing::info!(worker_id, "delivery consumer starting");
                queue
                    .run(
                        QUEUE_NAME,
                        move || random_interval(&interval),
                        shutdown,
                        |payload, tx| {
                            let sender = sender.clone();
                            let encryption_key = encryption_key.clone();
                            let backoff = backoff.clone();
                            async move {
                                handle_webhook_delivery_job(payload, tx, &sender, &encryption_key, &backoff).await
                            }
                        },
                    )
                    .await;
            })
        })
        .collect();

    Ok(handles)
}

/// Spawn the periodic recovery-sweep task (§7), re-enqueuing stranded
/// pending attempts until `shutdown` fires.
pub fn spawn_sweep(
    pool: PgPool,
    interval_secs: u64,
    stale_after_secs: u64,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let queue = Queue::new(pool.clone());

    tokio::spawn(async move {
        tracing::info!("recovery sweep task starting");
        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = sweep::run_sweep(&pool, &queue, stale_after_secs).await {
                tracing::error!(error = %e, "recovery sweep pass failed");
            }

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(interval_secs)) => {}
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("recovery sweep task stopped");
    })
}

fn random_interval(interval: &PollingInterval) -> Duration {
    let secs = rand::thread_rng().gen_range(interval.min_secs..=interval.max_secs);
    Duration::from_secs_f64(secs.max(0.0))
}
