/*!
 * Bearer API-key authentication (§4.2, §4.8).
 *
 * The presented token is hashed with the same triple-SHA-512 scheme used to
 * store keys and looked up by hash — no secret ever round-trips in clear
 * text after creation.
 */

use axum::extract::{FromRequestParts, Request};
use axum::http::{header, request::Parts, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sqlx::PgPool;
use zebrahook_common::crypto::hash_api_key;
use zebrahook_domain::api_key::ApiKeyStatus;

/// Successful authentication carries nothing beyond "a valid, enabled key
/// was presented" — there is no multi-tenant principal to attach (§1).
pub struct AuthenticatedKey;

impl<S> FromRequestParts<S> for AuthenticatedKey
where
    PgPool: axum::extract::FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingToken)?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let pool = PgPool::from_ref(state);
        let hash = hash_api_key(token);

        let status: Option<(ApiKeyStatus,)> =
            sqlx::query_as("SELECT status FROM api_keys WHERE hash = $1")
                .bind(hash)
                .fetch_optional(&pool)
                .await
                .map_err(|_| AuthError::InternalError)?;

        match status {
            Some((ApiKeyStatus::Enabled,)) => Ok(AuthenticatedKey),
            Some((ApiKeyStatus::Disabled,)) => Err(AuthError::InvalidToken),
            None => Err(AuthError::InvalidToken),
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "missing bearer token"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid or disabled api key"),
            AuthError::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Track request counts/latency for every request, auth or not (used by the
/// metrics side listener).
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let method = req.method().to_string();
    let start = std::time::Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    let elapsed = start.elapsed().as_secs_f64();

    crate::metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();
    crate::metrics::HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path])
        .observe(elapsed);

    response
}
