use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

/// A typed JSON payload submitted for delivery. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub id: i64,
    pub event_type: String,
    pub event_content: JsonValue,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One element of a `submitNewEvents` batch (§4.3).
#[derive(Debug, Clone, Validate, Deserialize)]
pub struct NewEvent {
    #[validate(length(min = 1))]
    pub event_type: String,

    pub event_content: JsonValue,

    pub priority: Option<i32>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct SubmitNewEventsRequest {
    #[validate(length(min = 1))]
    #[validate(nested)]
    pub events: Vec<NewEvent>,
}

#[derive(Debug, Serialize)]
pub struct SubmitNewEventsResult {
    pub success: bool,
}

/// The `event_mapping` queue job payload (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMappingJob {
    pub event_type: String,
    pub event_id: i64,
}
