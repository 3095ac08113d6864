/*!
 * Delivery consumer (C6, §4.6): loads one attempt, sends it, and records the
 * outcome — scheduling the next retry or disabling the endpoint on
 * exhaustion, all inside the transaction the queue handed us.
 */

use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::postgres::Postgres;
use sqlx::Transaction;
use tracing::{info, warn};
use zebrahook_common::crypto::{decrypt_secret, signature_header_value, EncryptionKey};
use zebrahook_config::BackoffConfig;
use zebrahook_domain::delivery::WebhookDeliveryJob;
use zebrahook_queue::{decode_payload, encode_payload, Queue};

use crate::backoff::{next_attempt_counter, next_retry_seconds};
use crate::delivery::Sender;

pub const QUEUE_NAME: &str = "webhook_delivery";

#[derive(sqlx::FromRow)]
struct LoadedAttempt {
    event_delivery_id: i64,
    attempt_made_at: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct LoadedDeliveryTarget {
    url: String,
    secret_encrypted: String,
    event_content: JsonValue,
    attempts_remaining: i32,
}

/// The `webhook_delivery` job handler. Bound to a fixed sender/key/backoff
/// so it can be passed straight to [`zebrahook_queue::Queue::run`].
pub async fn handle_webhook_delivery_job(
    payload: JsonValue,
    tx: &mut Transaction<'_, Postgres>,
    sender: &Sender,
    encryption_key: &EncryptionKey,
    backoff: &BackoffConfig,
) -> Result<(), String> {
    let job: WebhookDeliveryJob = decode_payload(&payload).map_err(|e| e.to_string())?;

    let attempt: Option<LoadedAttempt> = sqlx::query_as(
        "SELECT event_delivery_id, attempt_made_at FROM event_delivery_attempts WHERE id = $1",
    )
    .bind(job.event_delivery_attempt_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| e.to_string())?;

    let Some(attempt) = attempt else {
        return Err(format!(
            "attempt {} not found",
            job.event_delivery_attempt_id
        ));
    };

    if attempt.attempt_made_at.is_some() {
        return Err(format!(
            "attempt {} already dispatched, refusing to double-send",
            job.event_delivery_attempt_id
        ));
    }

    let target: LoadedDeliveryTarget = sqlx::query_as(
        r#"
        SELECT e.url, e.secret_encrypted, ev.event_content, d.attempts_remaining
        FROM event_deliveries d
        JOIN endpoints e ON e.id = d.endpoint_id
        JOIN events ev ON ev.id = d.event_id
        WHERE d.id = $1
        "#,
    )
    .bind(attempt.event_delivery_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| e.to_string())?;

    let secret = decrypt_secret(&target.secret_encrypted, encryption_key).map_err(|e| e.to_string())?;
    let secret = String::from_utf8(secret).map_err(|e| e.to_string())?;

    let body = serde_json::to_string(&target.event_content).map_err(|e| e.to_string())?;
    let t = Utc::now().timestamp();
    let sig_header = signature_header_value(t, &body, &secret);

    let result = sender.send(&target.url, &body, &sig_header).await;

    info!(
        event_delivery_id = attempt.event_delivery_id,
        attempt_id = job.event_delivery_attempt_id,
        outcome = ?result.outcome,
        status = result.http_status_code,
        "delivery attempt completed"
    );

    sqlx::query(
        r#"
        UPDATE event_delivery_attempts
        SET status = $2, attempt_made_at = $3, http_status_code = $4,
            http_body_response = $5, http_response_time_secs = $6, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(job.event_delivery_attempt_id)
    .bind(result.outcome.to_status())
    .bind(t)
    .bind(result.http_status_code)
    .bind(&result.http_body_response)
    .bind(result.http_response_time_secs)
    .execute(&mut **tx)
    .await
    .map_err(|e| e.to_string())?;

    sqlx::query(
        "UPDATE event_deliveries SET attempts_counter = attempts_counter + 1, updated_at = now() WHERE id = $1",
    )
    .bind(attempt.event_delivery_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| e.to_string())?;

    if result.outcome.is_success() {
        sqlx::query("UPDATE event_deliveries SET attempts_remaining = 0, updated_at = now() WHERE id = $1")
            .bind(attempt.event_delivery_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| e.to_string())?;
        return Ok(());
    }

    if target.attempts_remaining - 1 <= 0 {
        sqlx::query("UPDATE endpoints SET status = 'disabled', updated_at = now() WHERE id = $1")
            .bind(&job.endpoint_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| e.to_string())?;
        sqlx::query("UPDATE event_deliveries SET attempts_remaining = 0, updated_at = now() WHERE id = $1")
            .bind(attempt.event_delivery_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| e.to_string())?;
        warn!(
            endpoint_id = %job.endpoint_id,
            "endpoint exhausted its retry budget, disabling"
        );
        return Ok(());
    }

    let counter = next_attempt_counter(job.attempt_counter);
    let wait_secs = next_retry_seconds(counter, backoff.base_secs);
    let next_run_after = Utc::now() + chrono::Duration::milliseconds((wait_secs * 1000.0) as i64);

    sqlx::query(
        "UPDATE event_deliveries SET attempts_remaining = attempts_remaining - 1, next_attempt_scheduled_at = $2, updated_at = now() WHERE id = $1",
    )
    .bind(attempt.event_delivery_id)
    .bind(next_run_after.timestamp())
    .execute(&mut **tx)
    .await
    .map_err(|e| e.to_string())?;

    let next_attempt: (i64,) = sqlx::query_as(
        "INSERT INTO event_delivery_attempts (event_delivery_id, status, created_at, updated_at) VALUES ($1, 'pending', now(), now()) RETURNING id",
    )
    .bind(attempt.event_delivery_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| e.to_string())?;

    let next_job = WebhookDeliveryJob {
        event_delivery_attempt_id: next_attempt.0,
        event_id: job.event_id,
        endpoint_id: job.endpoint_id,
        attempt_counter: Some(counter),
    };

    Queue::enqueue_in_tx(
        tx,
        QUEUE_NAME,
        encode_payload(&next_job).map_err(|e| e.to_string())?,
        Some(next_run_after),
        &[],
    )
    .await
    .map_err(|e| e.to_string())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_name() {
        assert_eq!(QUEUE_NAME, "webhook_delivery");
    }
}
