use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Endpoint {
    pub id: String,
    pub url: String,
    pub secret_encrypted: String,
    pub enabled_events: Vec<String>,
    pub metadata: JsonValue,
    pub status: EndpointStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
pub enum EndpointStatus {
    Enabled,
    Disabled,
}

#[derive(Debug, Validate, Deserialize)]
pub struct RegisterEndpointRequest {
    #[validate(url)]
    pub url: String,

    #[validate(length(min = 1))]
    pub enabled_events: Vec<String>,

    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct UpdateEndpointRequest {
    #[validate(url)]
    pub url: Option<String>,

    pub disabled: Option<bool>,

    pub enabled_events: Option<Vec<String>>,

    pub metadata: Option<HashMap<String, String>>,
}

/// Returned once, at registration time, containing the clear-text secret.
#[derive(Debug, Serialize)]
pub struct EndpointIdAndSecret {
    pub id: String,
    pub secret: String,
}

/// Endpoint representation without the secret — used by list/get-many responses.
#[derive(Debug, Serialize)]
pub struct EndpointWithoutSecret {
    pub id: String,
    pub url: String,
    pub enabled_events: Vec<String>,
    pub metadata: JsonValue,
    pub status: EndpointStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Endpoint> for EndpointWithoutSecret {
    fn from(e: Endpoint) -> Self {
        Self {
            id: e.id,
            url: e.url,
            enabled_events: e.enabled_events,
            metadata: e.metadata,
            status: e.status,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// Full endpoint detail including the decrypted secret — returned only by
/// the single-endpoint "get" path, never by list.
#[derive(Debug, Serialize)]
pub struct EndpointDetail {
    pub id: String,
    pub secret: String,
    pub url: String,
    pub enabled_events: Vec<String>,
    pub metadata: JsonValue,
    pub status: EndpointStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal shape for fan-out matching (§4.4/§4.7).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MatchedEndpoint {
    pub id: String,
}

/// Minimal shape the delivery worker needs to load for a send (§4.7).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EndpointForDelivery {
    pub url: String,
    pub secret_encrypted: String,
}
