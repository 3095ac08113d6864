/*!
 * Recovery sweep (SPEC_FULL.md §7): periodically re-enqueues deliveries
 * whose latest attempt never actually got dispatched — the gap left open
 * when a fan-out or delivery transaction commits but the matching
 * `pgq_jobs` enqueue never lands (process crash between the two).
 */

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};
use zebrahook_domain::delivery::WebhookDeliveryJob;
use zebrahook_queue::{encode_payload, Queue};

#[derive(sqlx::FromRow)]
struct StrandedAttempt {
    id: i64,
    event_delivery_id: i64,
    event_id: i64,
    endpoint_id: String,
    attempts_counter: i32,
}

/// Run one sweep pass: find attempts still `pending` with no
/// `attempt_made_at`, scheduled more than `stale_after_secs` ago, and
/// re-enqueue a `webhook_delivery` job for each.
pub async fn run_sweep(pool: &PgPool, queue: &Queue, stale_after_secs: u64) -> Result<usize, sqlx::Error> {
    let cutoff = Utc::now().timestamp() - stale_after_secs as i64;

    let stranded: Vec<StrandedAttempt> = sqlx::query_as(
        r#"
        SELECT a.id, a.event_delivery_id, d.event_id, d.endpoint_id, d.attempts_counter
        FROM event_delivery_attempts a
        JOIN event_deliveries d ON d.id = a.event_delivery_id
        WHERE a.status = 'pending'
          AND a.attempt_made_at IS NULL
          AND d.next_attempt_scheduled_at <= $1
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    let count = stranded.len();
    if count > 0 {
        warn!(count, "recovery sweep found stranded pending attempts");
    }

    for attempt in stranded {
        let attempt_counter = if attempt.attempts_counter == 0 {
            None
        } else {
            Some(attempt.attempts_counter + 1)
        };

        let job = WebhookDeliveryJob {
            event_delivery_attempt_id: attempt.id,
            event_id: attempt.event_id,
            endpoint_id: attempt.endpoint_id,
            attempt_counter,
        };

        match encode_payload(&job) {
            Ok(payload) => {
                if let Err(e) = queue
                    .enqueue(super::worker::QUEUE_NAME, payload, None, &[])
                    .await
                {
                    warn!(attempt_id = attempt.id, error = %e, "failed to re-enqueue stranded attempt");
                }
            }
            Err(e) => warn!(attempt_id = attempt.id, error = %e, "failed to encode recovery job"),
        }
    }

    info!(count, "recovery sweep pass complete");
    Ok(count)
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_module_compiles() {
        // exercised end-to-end in tests/ against a real database
    }
}
