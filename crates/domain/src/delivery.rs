use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One (event, endpoint) pair produced by fan-out, carrying retry state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventDelivery {
    pub id: i64,
    pub event_id: i64,
    pub endpoint_id: String,
    pub attempts_counter: i32,
    pub attempts_remaining: i32,
    pub next_attempt_scheduled_at: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "snake_case")]
pub enum AttemptStatus {
    Pending,
    Success,
    ErrorResponse,
    ErrorTimeout,
    ErrorNetwork,
}

/// One concrete HTTP POST try with its recorded outcome.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventDeliveryAttempt {
    pub id: i64,
    pub event_delivery_id: i64,
    pub status: AttemptStatus,
    pub attempt_made_at: Option<i64>,
    pub http_status_code: Option<i32>,
    pub http_body_response: Option<String>,
    pub http_response_time_secs: Option<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The outcome of executing a single HTTP POST to an endpoint (§4.6 step 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success,
    ErrorResponse,
    ErrorTimeout,
    ErrorNetwork,
}

impl DeliveryOutcome {
    pub fn to_status(self) -> AttemptStatus {
        match self {
            DeliveryOutcome::Success => AttemptStatus::Success,
            DeliveryOutcome::ErrorResponse => AttemptStatus::ErrorResponse,
            DeliveryOutcome::ErrorTimeout => AttemptStatus::ErrorTimeout,
            DeliveryOutcome::ErrorNetwork => AttemptStatus::ErrorNetwork,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, DeliveryOutcome::Success)
    }
}

/// The `webhook_delivery` queue job payload (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDeliveryJob {
    pub event_delivery_attempt_id: i64,
    pub event_id: i64,
    pub endpoint_id: String,
    /// Carried forward so the next attempt can compute
    /// `next_attempt_counter = (attempt_counter ?? 1) + 1`.
    pub attempt_counter: Option<i32>,
}
