use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::lifecycle::ticket::{advance_item, set_rush};
use crate::models::ticket::{ItemStatus, KitchenTicket, TicketStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tickets/:id", get(get_ticket))
        .route("/tickets/:id/items/:index", post(advance_ticket_item))
        .route("/tickets/:id/items/:index/rush", post(rush_ticket_item))
        .route("/orders/:id/ticket", get(get_ticket_for_order))
}

#[derive(Deserialize)]
pub struct AdvanceItemRequest {
    pub target: ItemStatus,
}

#[derive(Serialize)]
pub struct TicketResponse {
    #[serde(flatten)]
    pub ticket: KitchenTicket,
    pub ticket_status: TicketStatus,
    pub age_seconds: i64,
}

fn ticket_response(ticket: KitchenTicket) -> TicketResponse {
    let ticket_status = ticket.ticket_status();
    let age_seconds = ticket.age_seconds(Utc::now());
    TicketResponse {
        ticket,
        ticket_status,
        age_seconds,
    }
}

async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketResponse>, AppError> {
    let ticket = state
        .tickets
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("ticket {} not found", id)))?;

    Ok(Json(ticket_response(ticket)))
}

async fn get_ticket_for_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<TicketResponse>, AppError> {
    let ticket_id = state
        .ticket_by_order
        .get(&order_id)
        .map(|entry| *entry.value())
        .ok_or_else(|| AppError::NotFound(format!("no ticket for order {}", order_id)))?;

    let ticket = state
        .tickets
        .get(&ticket_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("ticket {} not found", ticket_id)))?;

    Ok(Json(ticket_response(ticket)))
}

async fn advance_ticket_item(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(Uuid, usize)>,
    Json(payload): Json<AdvanceItemRequest>,
) -> Result<Json<TicketResponse>, AppError> {
    let ticket = advance_item(&state, id, index, payload.target).await?;
    Ok(Json(ticket_response(ticket)))
}

async fn rush_ticket_item(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<TicketResponse>, AppError> {
    let ticket = set_rush(&state, id, index).await?;
    Ok(Json(ticket_response(ticket)))
}
