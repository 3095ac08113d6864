/*!
 * Liveness/readiness probes (§4.8).
 */

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;

pub async fn health_check() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}

pub async fn readiness_check(State(pool): State<PgPool>) -> (StatusCode, Json<JsonValue>) {
    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "error": e.to_string() })),
        ),
    }
}
