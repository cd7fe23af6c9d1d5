use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use farebox_ticketing::{ScanRequest, Ticket, TicketClass, TicketSnapshot, TicketStatus};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PurchaseTicketsRequest {
    pub user_id: Uuid,
    pub ticket_class: TicketClass,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub total_cents: i64,
    pub currency: String,
    pub payment_status: String,
    pub tickets: Vec<TicketResponse>,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub ticket_class: TicketClass,
    pub status: TicketStatus,
    pub price_cents: i64,
    pub currency: String,
    pub validity_start: Option<DateTime<Utc>>,
    pub validity_end: Option<DateTime<Utc>>,
    pub remaining_validations: Option<u32>,
    pub scan_token: String,
}

impl TicketResponse {
    fn from_domain(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id,
            order_id: ticket.order_id,
            ticket_class: ticket.class,
            status: ticket.status,
            price_cents: ticket.price_cents,
            currency: ticket.currency.clone(),
            validity_start: ticket.validity_start,
            validity_end: ticket.validity_end,
            remaining_validations: ticket.remaining_validations,
            scan_token: ticket.scan_token.clone(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/tickets/purchase
/// Create an order's tickets and hand settlement to the payment service.
pub async fn purchase_tickets(
    State(state): State<AppState>,
    Json(req): Json<PurchaseTicketsRequest>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state
        .purchase
        .purchase(req.user_id, req.ticket_class, req.quantity)
        .await
        .map_err(AppError::from_purchase)?;

    Ok(Json(OrderResponse {
        order_id: order.order_id,
        user_id: order.user_id,
        total_cents: order.total_cents,
        currency: order.currency.clone(),
        payment_status: order.payment_status.clone(),
        tickets: order.tickets.iter().map(TicketResponse::from_domain).collect(),
    }))
}

/// POST /v1/tickets/{id}/activate
/// Start a purchased ticket's validity period.
pub async fn activate_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<TicketResponse>, AppError> {
    let mut ticket = state
        .tickets
        .find_by_id(ticket_id)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?
        .ok_or_else(|| AppError::NotFound(format!("Ticket not found: {}", ticket_id)))?;

    ticket.activate(Utc::now()).map_err(AppError::from_ticket)?;

    state
        .tickets
        .save(&ticket)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    tracing::info!(
        %ticket_id,
        valid_until = ?ticket.validity_end,
        "Ticket activated"
    );

    Ok(Json(TicketResponse::from_domain(&ticket)))
}

/// POST /v1/tickets/validate
/// Driver-side scan: consume one use of the ticket behind the token.
pub async fn validate_ticket(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> Result<Json<TicketSnapshot>, AppError> {
    let snapshot = state
        .validation
        .validate_scan(&req)
        .await
        .map_err(AppError::from_validation)?;

    Ok(Json(snapshot))
}

/// GET /v1/tickets/{id}
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<TicketResponse>, AppError> {
    let ticket = state
        .tickets
        .find_by_id(ticket_id)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?
        .ok_or_else(|| AppError::NotFound(format!("Ticket not found: {}", ticket_id)))?;

    Ok(Json(TicketResponse::from_domain(&ticket)))
}

/// GET /v1/users/{user_id}/tickets
pub async fn list_user_tickets(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<TicketResponse>>, AppError> {
    let tickets = state
        .tickets
        .find_by_user(user_id)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    Ok(Json(tickets.iter().map(TicketResponse::from_domain).collect()))
}
