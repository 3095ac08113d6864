//! A single-table relational job queue (C1), backing the `event_mapping`
//! and `webhook_delivery` queues described in the top-level spec.
//!
//! Leasing is done with `SELECT … FOR UPDATE SKIP LOCKED`, the same pattern
//! used for webhook-delivery claiming in the pack's trovato reference
//! service, generalized here into a named-queue capability with a handler
//! callback instead of being hardwired to one job type.

pub mod job;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::Postgres;
use sqlx::{PgPool, Transaction};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub use job::{decode_payload, encode_payload, decode_retry_waits, encode_retry_waits, QueueJobRow};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("handler error: {0}")]
    Handler(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;

/// Handle to the shared job table. Cheap to clone (wraps a `PgPool`).
#[derive(Clone)]
pub struct Queue {
    pool: PgPool,
}

/// Cooperative shutdown signal for `Queue::run` loops, mirroring the
/// broadcast-channel shutdown the delivery worker's process uses.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

impl Queue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a job. Returns the new job id. Not visible to consumers until
    /// `run_after <= now`.
    pub async fn enqueue(
        &self,
        queue_name: &str,
        payload: JsonValue,
        run_after: Option<DateTime<Utc>>,
        retry_waits: &[u64],
    ) -> Result<i64> {
        let run_after = run_after.unwrap_or_else(Utc::now);
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO pgq_jobs (queue_name, payload, run_after, retry_waits, created_at)
            VALUES ($1, $2, $3, $4, now())
            RETURNING id
            "#,
        )
        .bind(queue_name)
        .bind(&payload)
        .bind(run_after)
        .bind(job::encode_retry_waits(retry_waits))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Same as [`Self::enqueue`] but participates in the caller's
    /// transaction — used by the fan-out worker so the delivery rows and
    /// the job that will process them commit atomically.
    pub async fn enqueue_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        queue_name: &str,
        payload: JsonValue,
        run_after: Option<DateTime<Utc>>,
        retry_waits: &[u64],
    ) -> Result<i64> {
        let run_after = run_after.unwrap_or_else(Utc::now);
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO pgq_jobs (queue_name, payload, run_after, retry_waits, created_at)
            VALUES ($1, $2, $3, $4, now())
            RETURNING id
            "#,
        )
        .bind(queue_name)
        .bind(&payload)
        .bind(run_after)
        .bind(job::encode_retry_waits(retry_waits))
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.0)
    }

    /// Lease the oldest due job on `queue_name`, running `handler` against
    /// it inside the same transaction that claimed it. Returns `Ok(true)` if
    /// a job was claimed (whether the handler succeeded or not), `Ok(false)`
    /// if the queue was empty.
    async fn tick<F, Fut>(&self, queue_name: &str, handler: &F) -> Result<bool>
    where
        F: Fn(JsonValue, &mut Transaction<'_, Postgres>) -> Fut,
        Fut: Future<Output = std::result::Result<(), String>>,
    {
        let mut tx = self.pool.begin().await?;

        let claimed: Option<QueueJobRow> = sqlx::query_as(
            r#"
            SELECT id, queue_name, payload, run_after, retry_waits, ran_at, error, created_at
            FROM pgq_jobs
            WHERE queue_name = $1
              AND ran_at IS NULL
              AND run_after <= now()
            ORDER BY run_after ASC, id ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(queue_name)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(job) = claimed else {
            tx.rollback().await?;
            return Ok(false);
        };

        debug!(job_id = job.id, queue_name, "leased job");

        let outcome = handler(job.payload.clone(), &mut tx).await;

        match outcome {
            Ok(()) => {
                sqlx::query("UPDATE pgq_jobs SET ran_at = now() WHERE id = $1")
                    .bind(job.id)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                debug!(job_id = job.id, "job completed");
            }
            Err(handler_err) => {
                let mut waits = job::decode_retry_waits(&job.retry_waits);
                if waits.is_empty() {
                    sqlx::query(
                        "UPDATE pgq_jobs SET ran_at = now(), error = $2 WHERE id = $1",
                    )
                    .bind(job.id)
                    .bind(&handler_err)
                    .execute(&mut *tx)
                    .await?;
                    warn!(job_id = job.id, error = %handler_err, "job exhausted retry waits, marking done");
                } else {
                    let wait_secs = waits.remove(0);
                    let next_run_after = Utc::now() + chrono::Duration::seconds(wait_secs as i64);
                    sqlx::query(
                        "UPDATE pgq_jobs SET run_after = $2, retry_waits = $3, error = $4 WHERE id = $1",
                    )
                    .bind(job.id)
                    .bind(next_run_after)
                    .bind(job::encode_retry_waits(&waits))
                    .bind(&handler_err)
                    .execute(&mut *tx)
                    .await?;
                    warn!(job_id = job.id, error = %handler_err, wait_secs, "job failed, rescheduled");
                }
                tx.commit().await?;
            }
        }

        Ok(true)
    }

    /// Run a consumer loop against `queue_name` until `shutdown` fires.
    /// `poll_interval` is invoked once per empty tick to get a fresh
    /// randomized sleep duration (see `zebrahook_config::WorkerConfig`).
    pub async fn run<F, Fut, P>(
        &self,
        queue_name: &str,
        mut poll_interval: P,
        mut shutdown: watch::Receiver<bool>,
        handler: F,
    ) where
        F: Fn(JsonValue, &mut Transaction<'_, Postgres>) -> Fut,
        Fut: Future<Output = std::result::Result<(), String>>,
        P: FnMut() -> Duration,
    {
        info!(queue_name, "consumer loop starting");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.tick(queue_name, &handler).await {
                Ok(true) => continue, // try to drain immediately
                Ok(false) => {
                    let interval = poll_interval();
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = shutdown.changed() => {}
                    }
                }
                Err(e) => {
                    error!(queue_name, error = %e, "queue tick failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        info!(queue_name, "consumer loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_waits_roundtrip() {
        let waits = vec![60, 300, 1800];
        let encoded = job::encode_retry_waits(&waits);
        let decoded = job::decode_retry_waits(&encoded);
        assert_eq!(waits, decoded);
    }

    #[test]
    fn test_payload_roundtrip() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Sample {
            event_type: String,
            event_id: i64,
        }

        let payload = Sample {
            event_type: "merchant-1.order.shipped".into(),
            event_id: 42,
        };

        let encoded = job::encode_payload(&payload).unwrap();
        let decoded: Sample = job::decode_payload(&encoded).unwrap();
        assert_eq!(payload, decoded);
    }
}
