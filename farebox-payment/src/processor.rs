use std::sync::Arc;

use farebox_core::bus::EventPublisher;
use farebox_core::gateway::{GatewayOutcome, PaymentGateway, PaymentMethod};
use farebox_core::BoxError;
use farebox_shared::{PaymentProcessedEvent, TicketPurchasedEvent};
use uuid::Uuid;

use crate::payment::{Payment, PaymentError, PaymentStatus};
use crate::repository::PaymentRepository;

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("Payment store error: {0}")]
    Store(BoxError),

    #[error("Payment gateway error: {0}")]
    Gateway(BoxError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Failed to publish payment-processed event for order {order_id}: {source}")]
    Publish { order_id: Uuid, source: BoxError },
}

/// Settles purchase events: creates a payment, drives it through the
/// gateway to a terminal status, and announces the outcome. Safe to call
/// again with the same event; the bus delivers at least once.
pub struct PaymentProcessor {
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    publisher: Arc<dyn EventPublisher>,
    processed_topic: String,
}

impl PaymentProcessor {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        publisher: Arc<dyn EventPublisher>,
        processed_topic: impl Into<String>,
    ) -> Self {
        Self {
            payments,
            gateway,
            publisher,
            processed_topic: processed_topic.into(),
        }
    }

    pub async fn handle_ticket_purchased(
        &self,
        event: &TicketPurchasedEvent,
    ) -> Result<Payment, ProcessorError> {
        tracing::info!(
            order_id = %event.order_id,
            user_id = %event.user_id,
            amount_cents = event.amount_cents,
            tickets = event.ticket_ids.len(),
            "Processing payment for order"
        );

        let mut payment = match self
            .payments
            .find_by_order_id(event.order_id)
            .await
            .map_err(ProcessorError::Store)?
        {
            Some(existing) if existing.is_terminal() => {
                tracing::info!(
                    order_id = %event.order_id,
                    payment_id = %existing.id,
                    status = existing.status.as_str(),
                    "Order already settled; ignoring redelivery"
                );
                return Ok(existing);
            }
            // An earlier attempt died mid-flight; resume it instead of
            // creating a duplicate.
            Some(existing) => existing,
            None => {
                let payment = Payment::new(
                    event.order_id,
                    event.user_id,
                    event.amount_cents,
                    event.currency.clone(),
                    PaymentMethod::CreditCard,
                    "TICKET_PURCHASE",
                );
                self.payments
                    .save(&payment)
                    .await
                    .map_err(ProcessorError::Store)?;
                payment
            }
        };

        if payment.status == PaymentStatus::Pending {
            payment.mark_processing()?;
            self.payments
                .save(&payment)
                .await
                .map_err(ProcessorError::Store)?;
        }

        let outcome = self
            .gateway
            .process(payment.amount_cents, &payment.currency, payment.method)
            .await
            .map_err(ProcessorError::Gateway)?;

        match outcome {
            GatewayOutcome::Approved => {
                payment.mark_completed()?;
                tracing::info!(
                    order_id = %payment.order_id,
                    transaction_id = %payment.transaction_id,
                    "Payment COMPLETED"
                );
            }
            GatewayOutcome::Declined { reason } => {
                payment.mark_failed(reason)?;
                tracing::warn!(
                    order_id = %payment.order_id,
                    reason = payment.failure_reason.as_deref().unwrap_or_default(),
                    "Payment FAILED"
                );
            }
        }

        self.payments
            .save(&payment)
            .await
            .map_err(ProcessorError::Store)?;

        self.publish_processed(&payment).await?;
        Ok(payment)
    }

    async fn publish_processed(&self, payment: &Payment) -> Result<(), ProcessorError> {
        let event = PaymentProcessedEvent::new(
            payment.id,
            payment.order_id,
            payment.user_id,
            payment.transaction_id.clone(),
            payment.amount_cents,
            payment.currency.clone(),
            payment.status.as_str().to_string(),
            payment.payment_type.clone(),
            payment.failure_reason.clone(),
        );

        let payload = serde_json::to_string(&event).map_err(|e| ProcessorError::Publish {
            order_id: payment.order_id,
            source: Box::new(e),
        })?;

        self.publisher
            .publish(&self.processed_topic, &event.partition_key(), &payload)
            .await
            .map_err(|source| ProcessorError::Publish {
                order_id: payment.order_id,
                source,
            })?;

        tracing::info!(
            order_id = %payment.order_id,
            event_id = %event.event_id,
            status = %event.status,
            "Published payment-processed event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryPaymentRepository;
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

    struct FixedGateway(GatewayOutcome);

    #[async_trait]
    impl PaymentGateway for FixedGateway {
        async fn process(
            &self,
            _: i64,
            _: &str,
            _: PaymentMethod,
        ) -> Result<GatewayOutcome, BoxError> {
            Ok(self.0.clone())
        }
    }

    fn purchase_event() -> TicketPurchasedEvent {
        TicketPurchasedEvent::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            vec![Uuid::new_v4(), Uuid::new_v4()],
            "MONTHLY".to_string(),
            24_000,
            "USD".to_string(),
        )
    }

    fn processor(
        repo: Arc<InMemoryPaymentRepository>,
        gateway: GatewayOutcome,
        publisher: Arc<RecordingPublisher>,
    ) -> PaymentProcessor {
        PaymentProcessor::new(
            repo,
            Arc::new(FixedGateway(gateway)),
            publisher,
            "payment.processed",
        )
    }

    #[tokio::test]
    async fn approval_produces_a_completed_payment_and_event() {
        let repo = Arc::new(InMemoryPaymentRepository::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let proc = processor(repo.clone(), GatewayOutcome::Approved, publisher.clone());
        let event = purchase_event();

        let payment = proc.handle_ticket_purchased(&event).await.unwrap();

        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.amount_cents, 24_000);
        assert_eq!(payment.order_id, event.order_id);
        assert!(payment.completed_at.is_some());

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        let (topic, key, payload) = &published[0];
        assert_eq!(topic, "payment.processed");
        assert_eq!(key, &event.order_id.to_string());

        let processed: PaymentProcessedEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(processed.status, "COMPLETED");
        assert_eq!(processed.transaction_id, payment.transaction_id);
        assert!(processed.failure_reason.is_none());
    }

    #[tokio::test]
    async fn decline_produces_a_failed_payment_with_a_reason() {
        let repo = Arc::new(InMemoryPaymentRepository::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let proc = processor(
            repo,
            GatewayOutcome::Declined {
                reason: "Simulated payment failure".to_string(),
            },
            publisher.clone(),
        );

        let payment = proc
            .handle_ticket_purchased(&purchase_event())
            .await
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(
            payment.failure_reason.as_deref(),
            Some("Simulated payment failure")
        );

        let published = publisher.published.lock().unwrap();
        let processed: PaymentProcessedEvent = serde_json::from_str(&published[0].2).unwrap();
        assert_eq!(processed.status, "FAILED");
        assert_eq!(
            processed.failure_reason.as_deref(),
            Some("Simulated payment failure")
        );
    }

    #[tokio::test]
    async fn redelivery_of_a_settled_order_is_a_no_op() {
        let repo = Arc::new(InMemoryPaymentRepository::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let proc = processor(repo.clone(), GatewayOutcome::Approved, publisher.clone());
        let event = purchase_event();

        let first = proc.handle_ticket_purchased(&event).await.unwrap();
        let second = proc.handle_ticket_purchased(&event).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.transaction_id, second.transaction_id);
        assert_eq!(repo.count().await.unwrap(), 1);

        // The processed event goes out once; the redelivery publishes nothing.
        assert_eq!(publisher.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn interrupted_processing_is_resumed_not_duplicated() {
        let repo = Arc::new(InMemoryPaymentRepository::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let event = purchase_event();

        // Simulate a consumer that died after persisting PROCESSING.
        let mut stalled = Payment::new(
            event.order_id,
            event.user_id,
            event.amount_cents,
            event.currency.clone(),
            PaymentMethod::CreditCard,
            "TICKET_PURCHASE",
        );
        stalled.mark_processing().unwrap();
        repo.save(&stalled).await.unwrap();

        let proc = processor(repo.clone(), GatewayOutcome::Approved, publisher);
        let payment = proc.handle_ticket_purchased(&event).await.unwrap();

        assert_eq!(payment.id, stalled.id);
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
