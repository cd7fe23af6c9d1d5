use chrono::{DateTime, Utc};
use farebox_core::gateway::PaymentMethod;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed
                | PaymentStatus::Failed
                | PaymentStatus::Refunded
                | PaymentStatus::Cancelled
        )
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PROCESSING" => Ok(PaymentStatus::Processing),
            "COMPLETED" => Ok(PaymentStatus::Completed),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            "CANCELLED" => Ok(PaymentStatus::Cancelled),
            other => Err(format!("Unknown payment status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PaymentError {
    #[error("Invalid payment transition from {from} to {to}")]
    InvalidPaymentTransition { from: String, to: String },
}

/// The settlement outcome for one order. Amount and currency are copied
/// verbatim from the purchase event and never recomputed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub payment_type: String,
    /// Assigned at creation, immutable afterwards.
    pub transaction_id: String,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn new(
        order_id: Uuid,
        user_id: Uuid,
        amount_cents: i64,
        currency: String,
        method: PaymentMethod,
        payment_type: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            user_id,
            amount_cents,
            currency,
            status: PaymentStatus::Pending,
            method,
            payment_type: payment_type.into(),
            transaction_id: generate_transaction_id(),
            failure_reason: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// PENDING -> PROCESSING.
    pub fn mark_processing(&mut self) -> Result<(), PaymentError> {
        self.transition_from(&[PaymentStatus::Pending], PaymentStatus::Processing)
    }

    /// PROCESSING -> COMPLETED. Stamps the completion time.
    pub fn mark_completed(&mut self) -> Result<(), PaymentError> {
        self.transition_from(&[PaymentStatus::Processing], PaymentStatus::Completed)?;
        self.completed_at = Some(self.updated_at);
        Ok(())
    }

    /// PROCESSING -> FAILED. Records why the gateway declined.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), PaymentError> {
        self.transition_from(&[PaymentStatus::Processing], PaymentStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    /// COMPLETED -> REFUNDED. Administrative only.
    pub fn mark_refunded(&mut self) -> Result<(), PaymentError> {
        self.transition_from(&[PaymentStatus::Completed], PaymentStatus::Refunded)
    }

    /// Any non-terminal state -> CANCELLED. Administrative only; the
    /// automated settlement path never cancels.
    pub fn mark_cancelled(&mut self) -> Result<(), PaymentError> {
        self.transition_from(
            &[PaymentStatus::Pending, PaymentStatus::Processing],
            PaymentStatus::Cancelled,
        )
    }

    fn transition_from(
        &mut self,
        allowed: &[PaymentStatus],
        to: PaymentStatus,
    ) -> Result<(), PaymentError> {
        if !allowed.contains(&self.status) {
            return Err(PaymentError::InvalidPaymentTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn generate_transaction_id() -> String {
    let raw = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TXN-{}", &raw[..13])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment() -> Payment {
        Payment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            2_000,
            "USD".to_string(),
            PaymentMethod::CreditCard,
            "TICKET_PURCHASE",
        )
    }

    #[test]
    fn happy_path_runs_pending_processing_completed() {
        let mut p = payment();
        assert_eq!(p.status, PaymentStatus::Pending);
        assert!(p.transaction_id.starts_with("TXN-"));
        assert_eq!(p.transaction_id.len(), "TXN-".len() + 13);

        p.mark_processing().unwrap();
        assert_eq!(p.status, PaymentStatus::Processing);

        p.mark_completed().unwrap();
        assert_eq!(p.status, PaymentStatus::Completed);
        assert!(p.completed_at.is_some());
        assert!(p.is_terminal());
    }

    #[test]
    fn failure_records_the_reason() {
        let mut p = payment();
        p.mark_processing().unwrap();
        p.mark_failed("Simulated payment failure").unwrap();

        assert_eq!(p.status, PaymentStatus::Failed);
        assert_eq!(
            p.failure_reason.as_deref(),
            Some("Simulated payment failure")
        );
        assert!(p.completed_at.is_none());
    }

    #[test]
    fn transitions_never_move_backwards() {
        let mut p = payment();

        // Straight to completed is illegal.
        assert_eq!(
            p.mark_completed().unwrap_err(),
            PaymentError::InvalidPaymentTransition {
                from: "PENDING".to_string(),
                to: "COMPLETED".to_string(),
            }
        );

        p.mark_processing().unwrap();
        p.mark_completed().unwrap();

        // Terminal payments reject further settlement transitions.
        assert!(p.mark_processing().is_err());
        assert!(p.mark_failed("late decline").is_err());
        assert!(p.mark_cancelled().is_err());
    }

    #[test]
    fn refund_only_from_completed_cancel_only_from_non_terminal() {
        let mut p = payment();
        assert!(p.mark_refunded().is_err());
        p.mark_cancelled().unwrap();
        assert_eq!(p.status, PaymentStatus::Cancelled);

        let mut p = payment();
        p.mark_processing().unwrap();
        p.mark_cancelled().unwrap();

        let mut p = payment();
        p.mark_processing().unwrap();
        p.mark_completed().unwrap();
        p.mark_refunded().unwrap();
        assert_eq!(p.status, PaymentStatus::Refunded);
    }
}
