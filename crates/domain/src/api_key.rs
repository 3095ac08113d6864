use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiKey {
    pub id: i64,
    pub hash: String,
    pub description: Option<String>,
    pub status: ApiKeyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
pub enum ApiKeyStatus {
    Enabled,
    Disabled,
}

#[derive(Debug, Validate, Deserialize)]
pub struct NewApiKeyRequest {
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// Returned exactly once, at creation time — contains the clear-text key.
#[derive(Debug, Serialize)]
pub struct NewApiKeyResult {
    pub api_key: String,
}
