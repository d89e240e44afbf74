use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::offer::respond;
use crate::error::AppError;
use crate::models::offer::AssignmentOffer;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/offers", get(list_offers))
        .route("/offers/:id/respond", post(respond_to_offer))
}

#[derive(Deserialize)]
pub struct RespondRequest {
    pub accept: bool,
}

async fn list_offers(State(state): State<Arc<AppState>>) -> Json<Vec<AssignmentOffer>> {
    let offers = state
        .offers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(offers)
}

async fn respond_to_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RespondRequest>,
) -> Result<Json<AssignmentOffer>, AppError> {
    let offer = respond(&state, id, payload.accept).await?;
    Ok(Json(offer))
}
