use axum::{
    extract::State,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{connection_gate, make_span_with_request_id, rate_limit, request_id_middleware},
    state::AppState,
};

pub mod profiles;
pub mod recommendations;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes(state.clone()))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
}

/// API routes under /api/v1.
///
/// Route layers run outermost-last-added, so the rate limiter sees every
/// request before the connection gate does.
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/recommendations", post(recommendations::recommend))
        .route("/profiles/:user_id/cache", delete(profiles::invalidate_cache))
        .route_layer(from_fn_with_state(state.clone(), connection_gate))
        .route_layer(from_fn_with_state(state, rate_limit))
}

/// Health check endpoint; reports the store connection without opening it
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let store = if state.gate.is_open() { "open" } else { "closed" };
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "store": store,
            "checked_at": Utc::now(),
        })),
    )
}
