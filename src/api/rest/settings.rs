use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use tracing::info;

use crate::config::AssignmentSettings;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/settings/assignment",
        get(get_settings).put(put_settings),
    )
}

async fn get_settings(State(state): State<Arc<AppState>>) -> Json<AssignmentSettings> {
    Json(state.settings.read().await.clone())
}

async fn put_settings(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AssignmentSettings>,
) -> Result<Json<AssignmentSettings>, AppError> {
    payload.validate()?;

    let mut settings = state.settings.write().await;
    *settings = payload.clone();

    info!(enabled = payload.enabled, max_distance_km = payload.max_distance_km, "assignment settings updated");
    Ok(Json(payload))
}
