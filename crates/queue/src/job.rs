use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A row in `pgq_jobs` (§3 `QueueJob`).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueueJobRow {
    pub id: i64,
    pub queue_name: String,
    pub payload: JsonValue,
    pub run_after: DateTime<Utc>,
    pub retry_waits: JsonValue,
    pub ran_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Retry waits are stored as a JSON array of seconds, mirroring the source's
/// `[]time.Duration` payload.
pub fn encode_retry_waits(waits: &[u64]) -> JsonValue {
    serde_json::json!(waits)
}

pub fn decode_retry_waits(value: &JsonValue) -> Vec<u64> {
    value
        .as_array()
        .map(|arr| arr.iter().filter_map(|v| v.as_u64()).collect())
        .unwrap_or_default()
}

/// Deserialize a job's payload into the caller's expected job struct.
pub fn decode_payload<T: for<'de> Deserialize<'de>>(
    payload: &JsonValue,
) -> Result<T, serde_json::Error> {
    serde_json::from_value(payload.clone())
}

pub fn encode_payload<T: Serialize>(payload: &T) -> Result<JsonValue, serde_json::Error> {
    serde_json::to_value(payload)
}
