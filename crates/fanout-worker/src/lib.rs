//! Fan-out consumer library (C5): turns an `event_mapping` job into one
//! delivery + attempt + `webhook_delivery` job per subscribed endpoint.
//!
//! This crate has no binary of its own — the single process entry point
//! (`zebrahook-api`'s `main`, per §4.9) spawns [`spawn_consumers`] when run
//! with `--worker=eventMapping`.

pub mod matcher;
pub mod worker;

use rand::Rng;
use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use zebrahook_config::{BackoffConfig, PollingInterval};
use zebrahook_queue::Queue;

pub use worker::{handle_event_mapping_job, DELIVERY_QUEUE_NAME, QUEUE_NAME};

/// Spawn `count` fan-out consumer tasks against `pool`, each polling
/// `event_mapping` with its own randomized interval in `[min,max]` (§5).
pub fn spawn_consumers(
    pool: PgPool,
    count: u32,
    polling_interval: PollingInterval,
    backoff: BackoffConfig,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let queue = Queue::new(pool);

    (0..count)
        .map(|worker_id| {
            let queue = queue.clone();
            let backoff = backoff.clone();
            let shutdown = shutdown.clone();
            let interval = polling_interval.clone();

            tokio::spawn(async move {
                tracing::info!(worker_id, "fan-out consumer starting");
                queue
                    .run(
                        QUEUE_NAME,
                        move || random_interval(&interval),
                        shutdown,
                        |payload, tx| {
                            let backoff = backoff.clone();
                            async move { handle_event_mapping_job(payload, tx, &backoff).await }
                        },
                    )
                    .await;
            })
        })
        .collect()
}

fn random_interval(interval: &PollingInterval) -> Duration {
    let secs = rand::thread_rng().gen_range(interval.min_secs..=interval.max_secs);
    Duration::from_secs_f64(secs.max(0.0))
}
