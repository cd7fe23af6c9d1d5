use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current version of the event contracts below. Bump on any field change;
/// consumers reject versions they do not understand.
pub const SCHEMA_VERSION: u16 = 1;

/// Published by the ticketing service after an order's tickets are all
/// persisted. Partition key is the order id, so settlement for one order is
/// delivered in order to a single consumer at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketPurchasedEvent {
    pub event_id: Uuid,
    pub schema_version: u16,
    pub order_id: Uuid,
    pub user_id: Uuid,
    /// Every ticket created for the order, not a single representative.
    pub ticket_ids: Vec<Uuid>,
    pub ticket_class: String,
    pub amount_cents: i64,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
}

impl TicketPurchasedEvent {
    pub fn new(
        order_id: Uuid,
        user_id: Uuid,
        ticket_ids: Vec<Uuid>,
        ticket_class: String,
        amount_cents: i64,
        currency: String,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            schema_version: SCHEMA_VERSION,
            order_id,
            user_id,
            ticket_ids,
            ticket_class,
            amount_cents,
            currency,
            timestamp: Utc::now(),
        }
    }

    /// Partition key for ordered delivery.
    pub fn partition_key(&self) -> String {
        self.order_id.to_string()
    }
}

/// Published by the payment service once a payment reaches a terminal
/// status. Keyed by order id like the purchase event it settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentProcessedEvent {
    pub event_id: Uuid,
    pub schema_version: u16,
    pub payment_id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub transaction_id: String,
    pub amount_cents: i64,
    pub currency: String,
    /// "COMPLETED" or "FAILED".
    pub status: String,
    pub payment_type: String,
    pub failure_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PaymentProcessedEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        payment_id: Uuid,
        order_id: Uuid,
        user_id: Uuid,
        transaction_id: String,
        amount_cents: i64,
        currency: String,
        status: String,
        payment_type: String,
        failure_reason: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            schema_version: SCHEMA_VERSION,
            payment_id,
            order_id,
            user_id,
            transaction_id,
            amount_cents,
            currency,
            status,
            payment_type,
            failure_reason,
            timestamp: Utc::now(),
        }
    }

    pub fn partition_key(&self) -> String {
        self.order_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_event_round_trips_through_json() {
        let event = TicketPurchasedEvent::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![Uuid::new_v4(), Uuid::new_v4()],
            "MONTHLY".to_string(),
            24_000,
            "USD".to_string(),
        );

        let json = serde_json::to_string(&event).unwrap();
        let decoded: TicketPurchasedEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded.schema_version, SCHEMA_VERSION);
        assert_eq!(decoded.order_id, event.order_id);
        assert_eq!(decoded.ticket_ids.len(), 2);
        assert_eq!(decoded.amount_cents, 24_000);
    }

    #[test]
    fn partition_key_is_the_order_id() {
        let order_id = Uuid::new_v4();
        let event = TicketPurchasedEvent::new(
            order_id,
            Uuid::new_v4(),
            vec![Uuid::new_v4()],
            "SINGLE".to_string(),
            250,
            "USD".to_string(),
        );

        assert_eq!(event.partition_key(), order_id.to_string());
    }
}
