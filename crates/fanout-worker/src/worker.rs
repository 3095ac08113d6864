/*!
 * Fan-out consumer (C5, §4.5): pulls `event_mapping` jobs, finds the
 * endpoints subscribed to the event, and creates one delivery + one pending
 * attempt + one queued `webhook_delivery` job per match — all inside the
 * transaction the queue handed us, so a crash mid-fan-out leaves no
 * half-created deliveries (I6).
 */

use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::postgres::Postgres;
use sqlx::Transaction;
use tracing::info;
use zebrahook_config::BackoffConfig;
use zebrahook_domain::delivery::WebhookDeliveryJob;
use zebrahook_domain::event::EventMappingJob;
use zebrahook_queue::{decode_payload, encode_payload, Queue};

use crate::matcher::find_matching_endpoints;

pub const QUEUE_NAME: &str = "event_mapping";
pub const DELIVERY_QUEUE_NAME: &str = "webhook_delivery";

/// The `event_mapping` job handler, bound to a fixed `backoff` config so it
/// can be passed straight to [`zebrahook_queue::Queue::run`].
pub async fn handle_event_mapping_job(
    payload: JsonValue,
    tx: &mut Transaction<'_, Postgres>,
    backoff: &BackoffConfig,
) -> Result<(), String> {
    let job: EventMappingJob = decode_payload(&payload).map_err(|e| e.to_string())?;

    let matches = find_matching_endpoints(&mut **tx, &job.event_type)
        .await
        .map_err(|e| e.to_string())?;

    info!(
        event_id = job.event_id,
        event_type = %job.event_type,
        matched = matches.len(),
        "fanning out event"
    );

    let now = Utc::now();

    for endpoint in matches {
        let delivery: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO event_deliveries
                (event_id, endpoint_id, attempts_counter, attempts_remaining, next_attempt_scheduled_at, created_at, updated_at)
            VALUES ($1, $2, 0, $3, $4, now(), now())
            RETURNING id
            "#,
        )
        .bind(job.event_id)
        .bind(&endpoint.id)
        .bind(backoff.max_attempts)
        .bind(now.timestamp())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| e.to_string())?;

        let attempt: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO event_delivery_attempts (event_delivery_id, status, created_at, updated_at)
            VALUES ($1, 'pending', now(), now())
            RETURNING id
            "#,
        )
        .bind(delivery.0)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| e.to_string())?;

        let delivery_payload = WebhookDeliveryJob {
            event_delivery_attempt_id: attempt.0,
            event_id: job.event_id,
            endpoint_id: endpoint.id,
            attempt_counter: None,
        };

        Queue::enqueue_in_tx(
            tx,
            DELIVERY_QUEUE_NAME,
            encode_payload(&delivery_payload).map_err(|e| e.to_string())?,
            Some(now),
            &[],
        )
        .await
        .map_err(|e| e.to_string())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_names_are_distinct() {
        assert_ne!(QUEUE_NAME, DELIVERY_QUEUE_NAME);
    }
}
