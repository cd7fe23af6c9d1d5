use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use farebox_payment::{Payment, PaymentStatus};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: String,
    pub payment_type: String,
    pub transaction_id: String,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentResponse {
    fn from_domain(payment: &Payment) -> Self {
        Self {
            id: payment.id,
            order_id: payment.order_id,
            user_id: payment.user_id,
            amount_cents: payment.amount_cents,
            currency: payment.currency.clone(),
            status: payment.status,
            payment_method: payment.method.as_str().to_string(),
            payment_type: payment.payment_type.clone(),
            transaction_id: payment.transaction_id.clone(),
            failure_reason: payment.failure_reason.clone(),
            created_at: payment.created_at,
            completed_at: payment.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentStatsResponse {
    pub total_payments: u64,
    pub completed_payments: u64,
    pub failed_payments: u64,
    pub pending_payments: u64,
    pub total_revenue_cents: i64,
}

/// GET /v1/payments/order/{order_id}
pub async fn get_payment_by_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, AppError> {
    let payment = state
        .payments
        .find_by_order_id(order_id)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?
        .ok_or_else(|| AppError::NotFound(format!("Payment not found for order: {}", order_id)))?;

    Ok(Json(PaymentResponse::from_domain(&payment)))
}

/// GET /v1/payments/transaction/{transaction_id}
pub async fn get_payment_by_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<PaymentResponse>, AppError> {
    let payment = state
        .payments
        .find_by_transaction_id(&transaction_id)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?
        .ok_or_else(|| {
            AppError::NotFound(format!("Payment not found for transaction: {}", transaction_id))
        })?;

    Ok(Json(PaymentResponse::from_domain(&payment)))
}

/// GET /v1/users/{user_id}/payments
pub async fn list_user_payments(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    let payments = state
        .payments
        .find_by_user(user_id)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

    Ok(Json(payments.iter().map(PaymentResponse::from_domain).collect()))
}

/// GET /v1/payments/stats
pub async fn payment_stats(
    State(state): State<AppState>,
) -> Result<Json<PaymentStatsResponse>, AppError> {
    let internal = |e: farebox_core::BoxError| AppError::Internal(anyhow::anyhow!(e));

    let total_payments = state.payments.count().await.map_err(internal)?;
    let completed = state
        .payments
        .list_by_status(PaymentStatus::Completed)
        .await
        .map_err(internal)?;
    let failed = state
        .payments
        .list_by_status(PaymentStatus::Failed)
        .await
        .map_err(internal)?;
    let pending = state
        .payments
        .list_by_status(PaymentStatus::Pending)
        .await
        .map_err(internal)?;

    let total_revenue_cents = completed.iter().map(|p| p.amount_cents).sum();

    Ok(Json(PaymentStatsResponse {
        total_payments,
        completed_payments: completed.len() as u64,
        failed_payments: failed.len() as u64,
        pending_payments: pending.len() as u64,
        total_revenue_cents,
    }))
}
