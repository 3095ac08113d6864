//! HTTP surface (C7) for zebrahook: event ingestion, endpoint registry,
//! health probes and metrics. The binary entry point in `main.rs` also
//! dispatches to the fan-out/delivery worker libraries and admin CLI
//! one-shots (§4.9) — this crate owns only the axum app.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the axum application. Shared by `main.rs` and integration tests.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/healthz", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readiness_check));

    let protected_routes = Router::new()
        .route("/events", post(handlers::events::submit_new_events))
        .route(
            "/endpoints",
            post(handlers::endpoints::register_endpoint).get(handlers::endpoints::list_endpoints),
        )
        .route(
            "/endpoints/{id}",
            get(handlers::endpoints::get_endpoint).put(handlers::endpoints::update_endpoint),
        );

    Router::new()
        .merge(public_routes)
        .nest("/v1/webhook", protected_routes)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(auth::track_metrics))
                .layer(TraceLayer::new_for_http()),
        )
}
