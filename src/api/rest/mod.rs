pub mod offers;
pub mod orders;
pub mod riders;
pub mod settings;
pub mod tickets;
pub mod ws;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use serde::Serialize;
use tower_http::services::ServeDir;

use crate::error::AppError;
use crate::models::order::Actor;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(orders::router())
        .merge(tickets::router())
        .merge(riders::router())
        .merge(offers::router())
        .merge(settings::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .fallback_service(ServeDir::new("static"))
}

/// Actor identity arrives as a header; authn/z is handled upstream. The
/// role only gates transition legality, and `system` is reserved for
/// internal edges.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AppError> {
    let raw = headers
        .get("x-actor-role")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("missing x-actor-role header".to_string()))?;

    match raw.to_ascii_lowercase().as_str() {
        "customer" => Ok(Actor::Customer),
        "vendor" => Ok(Actor::Vendor),
        "rider" => Ok(Actor::Rider),
        "admin" => Ok(Actor::Admin),
        other => Err(AppError::BadRequest(format!(
            "unknown actor role: {other}"
        ))),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    orders: usize,
    tickets: usize,
    riders: usize,
    offers: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        orders: state.orders.len(),
        tickets: state.tickets.len(),
        riders: state.riders.len(),
        offers: state.offers.len(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
