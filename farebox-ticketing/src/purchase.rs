use std::sync::Arc;

use farebox_core::bus::EventPublisher;
use farebox_core::BoxError;
use farebox_shared::TicketPurchasedEvent;
use serde::Serialize;
use uuid::Uuid;

use crate::pricing::{PricingCalculator, PricingError};
use crate::repository::TicketRepository;
use crate::ticket::{Ticket, TicketClass};

/// The caller-facing result of one purchase: the grouping key, the tickets
/// created under it, and the amount the payment service will settle.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub tickets: Vec<Ticket>,
    pub total_cents: i64,
    pub currency: String,
    /// Always "PENDING" at creation; settled asynchronously.
    pub payment_status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Failed to persist tickets for order {order_id}: {source}")]
    Persist { order_id: Uuid, source: BoxError },

    #[error("Tickets for order {order_id} were persisted but the settlement event was not published: {source}")]
    Publish { order_id: Uuid, source: BoxError },
}

/// Purchase orchestration: price the order, persist its tickets as one
/// unit, then hand settlement to the payment service over the bus.
pub struct PurchaseService {
    tickets: Arc<dyn TicketRepository>,
    pricing: PricingCalculator,
    publisher: Arc<dyn EventPublisher>,
    settlement_topic: String,
}

impl PurchaseService {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        pricing: PricingCalculator,
        publisher: Arc<dyn EventPublisher>,
        settlement_topic: impl Into<String>,
    ) -> Self {
        Self {
            tickets,
            pricing,
            publisher,
            settlement_topic: settlement_topic.into(),
        }
    }

    pub async fn purchase(
        &self,
        user_id: Uuid,
        class: TicketClass,
        quantity: u32,
    ) -> Result<Order, PurchaseError> {
        let quote = self.pricing.quote(class, quantity)?;
        let order_id = Uuid::new_v4();

        tracing::info!(
            %order_id,
            %user_id,
            class = class.as_str(),
            quantity,
            total_cents = quote.total_cents,
            "Processing ticket purchase"
        );

        let tickets: Vec<Ticket> = quote
            .per_ticket_cents
            .iter()
            .map(|&price_cents| {
                Ticket::new(user_id, order_id, class, price_cents, quote.currency.clone())
            })
            .collect();

        // All tickets land in one atomic write; a failure here leaves
        // nothing persisted and nothing billed.
        self.tickets
            .save_all(&tickets)
            .await
            .map_err(|source| PurchaseError::Persist { order_id, source })?;

        let event = TicketPurchasedEvent::new(
            order_id,
            user_id,
            tickets.iter().map(|t| t.id).collect(),
            class.as_str().to_string(),
            quote.total_cents,
            quote.currency.clone(),
        );
        let payload = serde_json::to_string(&event)
            .map_err(|e| PurchaseError::Publish { order_id, source: Box::new(e) })?;

        // Tickets are already durable at this point. If the publish fails
        // the order surfaces as an error and is left for reconciliation.
        self.publisher
            .publish(&self.settlement_topic, &event.partition_key(), &payload)
            .await
            .map_err(|source| PurchaseError::Publish { order_id, source })?;

        tracing::info!(%order_id, tickets = tickets.len(), "Published settlement event");

        Ok(Order {
            order_id,
            user_id,
            tickets,
            total_cents: quote.total_cents,
            currency: quote.currency,
            payment_status: "PENDING".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryTicketRepository;
    use crate::ticket::TicketStatus;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl EventPublisher for RecordingPublisher {
        async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), BoxError> {
            self.published.lock().unwrap().push((
                topic.to_string(),
                key.to_string(),
                payload.to_string(),
            ));
            Ok(())
        }
    }

    struct FailingRepository;

    #[async_trait]
    impl TicketRepository for FailingRepository {
        async fn save(&self, _: &Ticket) -> Result<(), BoxError> {
            Err("store unavailable".into())
        }
        async fn save_all(&self, _: &[Ticket]) -> Result<(), BoxError> {
            Err("store unavailable".into())
        }
        async fn find_by_id(&self, _: Uuid) -> Result<Option<Ticket>, BoxError> {
            Ok(None)
        }
        async fn find_by_scan_token(&self, _: &str) -> Result<Option<Ticket>, BoxError> {
            Ok(None)
        }
        async fn find_by_order(&self, _: Uuid) -> Result<Vec<Ticket>, BoxError> {
            Ok(vec![])
        }
        async fn find_by_user(&self, _: Uuid) -> Result<Vec<Ticket>, BoxError> {
            Ok(vec![])
        }
    }

    fn service(
        repo: Arc<dyn TicketRepository>,
        publisher: Arc<RecordingPublisher>,
    ) -> PurchaseService {
        PurchaseService::new(
            repo,
            PricingCalculator::default(),
            publisher,
            "ticket.purchased",
        )
    }

    #[tokio::test]
    async fn two_monthly_tickets_settle_as_one_event() {
        let repo = Arc::new(InMemoryTicketRepository::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let svc = service(repo.clone(), publisher.clone());
        let user_id = Uuid::new_v4();

        let order = svc
            .purchase(user_id, TicketClass::Monthly, 2)
            .await
            .unwrap();

        assert_eq!(order.tickets.len(), 2);
        assert_eq!(order.total_cents, 24_000);
        assert_eq!(order.payment_status, "PENDING");
        assert!(order
            .tickets
            .iter()
            .all(|t| t.status == TicketStatus::Purchased && t.order_id == order.order_id));

        // Scan tokens are unique across the order.
        assert_ne!(order.tickets[0].scan_token, order.tickets[1].scan_token);

        // Both tickets are durable.
        assert_eq!(repo.find_by_order(order.order_id).await.unwrap().len(), 2);

        // Exactly one settlement event, keyed by order id, full ticket list.
        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        let (topic, key, payload) = &published[0];
        assert_eq!(topic, "ticket.purchased");
        assert_eq!(key, &order.order_id.to_string());

        let event: TicketPurchasedEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.order_id, order.order_id);
        assert_eq!(event.amount_cents, 24_000);
        assert_eq!(event.ticket_ids.len(), 2);
    }

    #[tokio::test]
    async fn persist_failure_publishes_nothing() {
        let publisher = Arc::new(RecordingPublisher::default());
        let svc = service(Arc::new(FailingRepository), publisher.clone());

        let err = svc
            .purchase(Uuid::new_v4(), TicketClass::Single, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, PurchaseError::Persist { .. }));
        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_quantity_is_rejected_before_any_side_effect() {
        let repo = Arc::new(InMemoryTicketRepository::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let svc = service(repo, publisher.clone());

        let err = svc
            .purchase(Uuid::new_v4(), TicketClass::Single, 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PurchaseError::Pricing(PricingError::InvalidQuantity(0))
        ));
        assert!(publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn per_ticket_prices_sum_to_the_order_total() {
        let repo = Arc::new(InMemoryTicketRepository::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let svc = service(repo, publisher);

        // 7 tickets hit the 5% tier: 7 * 250 = 1750, minus 88 = 1662,
        // which does not divide evenly by 7.
        let order = svc
            .purchase(Uuid::new_v4(), TicketClass::Single, 7)
            .await
            .unwrap();
        let sum: i64 = order.tickets.iter().map(|t| t.price_cents).sum();
        assert_eq!(sum, order.total_cents);
        assert_eq!(order.total_cents, 1_662);
    }
}
