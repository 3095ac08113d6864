/*!
 * Event ingestion handoff (C4, §4.3).
 */

use axum::extract::State;
use axum::Json;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use validator::Validate;
use zebrahook_domain::event::{EventMappingJob, SubmitNewEventsRequest, SubmitNewEventsResult};
use zebrahook_queue::{encode_payload, Queue};

use crate::auth::AuthenticatedKey;
use crate::error::ApiError;

pub async fn submit_new_events(
    State(pool): State<PgPool>,
    _auth: AuthenticatedKey,
    Json(payload): Json<SubmitNewEventsRequest>,
) -> Result<Json<SubmitNewEventsResult>, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let mut events = payload.events;
    // stable sort, higher priority first (§4.3 step 1)
    events.sort_by(|a, b| {
        b.priority
            .unwrap_or(0)
            .cmp(&a.priority.unwrap_or(0))
    });

    let mut tx = pool.begin().await?;

    let mut created = Vec::with_capacity(events.len());
    for event in &events {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO events (event_type, event_content, priority, created_at, updated_at)
            VALUES ($1, $2, $3, now(), now())
            RETURNING id
            "#,
        )
        .bind(&event.event_type)
        .bind(&event.event_content as &JsonValue)
        .bind(event.priority.unwrap_or(0))
        .fetch_one(&mut *tx)
        .await?;

        created.push((row.0, event.event_type.clone()));
    }

    for (event_id, event_type) in created {
        let job = EventMappingJob {
            event_type,
            event_id,
        };
        Queue::enqueue_in_tx(
            &mut tx,
            zebrahook_fanout_worker::QUEUE_NAME,
            encode_payload(&job).map_err(|e| ApiError::Internal(e.to_string()))?,
            None,
            &[],
        )
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    }

    tx.commit().await?;

    crate::metrics::EVENTS_SUBMITTED_TOTAL
        .with_label_values(&["success"])
        .inc();

    Ok(Json(SubmitNewEventsResult { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zebrahook_domain::event::NewEvent;

    #[test]
    fn test_priority_sort_is_descending_and_stable() {
        let mut events = vec![
            NewEvent {
                event_type: "a".into(),
                event_content: serde_json::json!({}),
                priority: Some(1),
            },
            NewEvent {
                event_type: "b".into(),
                event_content: serde_json::json!({}),
                priority: Some(5),
            },
            NewEvent {
                event_type: "c".into(),
                event_content: serde_json::json!({}),
                priority: None,
            },
        ];
        events.sort_by(|a, b| b.priority.unwrap_or(0).cmp(&a.priority.unwrap_or(0)));
        let order: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }
}
