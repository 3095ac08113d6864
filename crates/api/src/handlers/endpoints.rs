/*!
 * Endpoint registry CRUD (C7, §4.7, §4.8).
 */

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use std::collections::HashMap;
use validator::Validate;
use zebrahook_common::crypto::{encrypt_secret, generate_webhook_secret, EncryptionKey};
use zebrahook_common::generate_endpoint_id;
use zebrahook_domain::endpoint::{
    Endpoint, EndpointDetail, EndpointIdAndSecret, EndpointWithoutSecret, RegisterEndpointRequest,
    UpdateEndpointRequest,
};

use crate::auth::AuthenticatedKey;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn register_endpoint(
    State(pool): State<PgPool>,
    State(config): State<zebrahook_config::Config>,
    _auth: AuthenticatedKey,
    Json(payload): Json<RegisterEndpointRequest>,
) -> Result<Json<EndpointIdAndSecret>, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let key = EncryptionKey::from_config_bytes(&config.encryption_key)?;
    let id = generate_endpoint_id();
    let clear_secret = generate_webhook_secret();
    let secret_encrypted = encrypt_secret(clear_secret.as_bytes(), &key)?;

    let metadata: JsonValue = payload
        .metadata
        .map(|m| json!(m))
        .unwrap_or_else(|| json!({}));

    sqlx::query(
        r#"
        INSERT INTO endpoints (id, url, secret_encrypted, enabled_events, metadata, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'enabled', now(), now())
        "#,
    )
    .bind(&id)
    .bind(&payload.url)
    .bind(&secret_encrypted)
    .bind(&payload.enabled_events)
    .bind(&metadata)
    .execute(&pool)
    .await?;

    Ok(Json(EndpointIdAndSecret {
        id,
        secret: clear_secret,
    }))
}

pub async fn update_endpoint(
    State(pool): State<PgPool>,
    Path(id): Path<String>,
    _auth: AuthenticatedKey,
    Json(payload): Json<UpdateEndpointRequest>,
) -> Result<Json<JsonValue>, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM endpoints WHERE id = $1")
        .bind(&id)
        .fetch_optional(&pool)
        .await?;
    if existing.is_none() {
        return Err(ApiError::NotFound(format!("endpoint {id} not found")));
    }

    if let Some(url) = &payload.url {
        sqlx::query("UPDATE endpoints SET url = $1, updated_at = now() WHERE id = $2")
            .bind(url)
            .bind(&id)
            .execute(&pool)
            .await?;
    }
    if let Some(enabled_events) = &payload.enabled_events {
        sqlx::query("UPDATE endpoints SET enabled_events = $1, updated_at = now() WHERE id = $2")
            .bind(enabled_events)
            .bind(&id)
            .execute(&pool)
            .await?;
    }
    if let Some(metadata) = &payload.metadata {
        sqlx::query("UPDATE endpoints SET metadata = $1, updated_at = now() WHERE id = $2")
            .bind(json!(metadata))
            .bind(&id)
            .execute(&pool)
            .await?;
    }
    if let Some(disabled) = payload.disabled {
        let status = if disabled { "disabled" } else { "enabled" };
        sqlx::query("UPDATE endpoints SET status = $1, updated_at = now() WHERE id = $2")
            .bind(status)
            .bind(&id)
            .execute(&pool)
            .await?;
    }

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct ListEndpointsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(rename = "createdAt.gte")]
    pub created_at_gte: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(rename = "updatedAt.lt")]
    pub updated_at_lt: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(flatten)]
    pub metadata: HashMap<String, String>,
}

/// Pull `metadata[k]=v` filters out of the flattened query map — the only
/// keys left in there once `limit`/`offset`/`createdAt.gte`/`updatedAt.lt`
/// have claimed their own named fields.
fn metadata_filters(query: &HashMap<String, String>) -> Vec<(String, String)> {
    query
        .iter()
        .filter_map(|(k, v)| {
            let key = k.strip_prefix("metadata[")?.strip_suffix(']')?;
            Some((key.to_string(), v.clone()))
        })
        .collect()
}

pub async fn list_endpoints(
    State(pool): State<PgPool>,
    _auth: AuthenticatedKey,
    Query(query): Query<ListEndpointsQuery>,
) -> Result<Json<JsonValue>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let offset = query.offset.unwrap_or(0).max(0);
    let metadata_filters = metadata_filters(&query.metadata);

    let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
        "SELECT id, url, secret_encrypted, enabled_events, metadata, status, created_at, updated_at FROM endpoints WHERE 1 = 1",
    );
    if let Some(created_at_gte) = query.created_at_gte {
        builder.push(" AND created_at >= ").push_bind(created_at_gte);
    }
    if let Some(updated_at_lt) = query.updated_at_lt {
        builder.push(" AND updated_at < ").push_bind(updated_at_lt);
    }
    for (key, value) in &metadata_filters {
        builder
            .push(" AND metadata ->> ")
            .push_bind(key.clone())
            .push(" = ")
            .push_bind(value.clone());
    }

    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows: Vec<Endpoint> = builder.build_query_as().fetch_all(&pool).await?;

    let result: Vec<EndpointWithoutSecret> = rows.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "result": result })))
}

pub async fn get_endpoint(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _auth: AuthenticatedKey,
) -> Result<Json<EndpointDetail>, ApiError> {
    let endpoint: Option<Endpoint> = sqlx::query_as(
        "SELECT id, url, secret_encrypted, enabled_events, metadata, status, created_at, updated_at FROM endpoints WHERE id = $1",
    )
    .bind(&id)
    .fetch_optional(&state.pool)
    .await?;

    let endpoint = endpoint.ok_or_else(|| ApiError::NotFound(format!("endpoint {id} not found")))?;

    let key = EncryptionKey::from_config_bytes(&state.config.encryption_key)?;
    let secret_bytes = zebrahook_common::crypto::decrypt_secret(&endpoint.secret_encrypted, &key)?;
    let secret = String::from_utf8(secret_bytes).map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(EndpointDetail {
        id: endpoint.id,
        secret,
        url: endpoint.url,
        enabled_events: endpoint.enabled_events,
        metadata: endpoint.metadata,
        status: endpoint.status,
        created_at: endpoint.created_at,
        updated_at: endpoint.updated_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_filters_extracts_bracketed_keys() {
        let mut query = HashMap::new();
        query.insert("metadata[tier]".to_string(), "gold".to_string());
        query.insert("metadata[region]".to_string(), "eu".to_string());
        query.insert("unrelated".to_string(), "ignored".to_string());

        let mut filters = metadata_filters(&query);
        filters.sort();

        assert_eq!(
            filters,
            vec![
                ("region".to_string(), "eu".to_string()),
                ("tier".to_string(), "gold".to_string()),
            ]
        );
    }

    #[test]
    fn test_metadata_filters_empty_when_no_brackets() {
        let mut query = HashMap::new();
        query.insert("limit".to_string(), "10".to_string());
        assert!(metadata_filters(&query).is_empty());
    }
}
