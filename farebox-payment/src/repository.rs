use std::collections::HashMap;

use async_trait::async_trait;
use farebox_core::BoxError;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::payment::{Payment, PaymentStatus};

/// Payment persistence seam. `save` is an upsert guarded by order-id
/// uniqueness: at most one payment row may ever exist per order.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn save(&self, payment: &Payment) -> Result<(), BoxError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, BoxError>;

    async fn find_by_order_id(&self, order_id: Uuid) -> Result<Option<Payment>, BoxError>;

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Payment>, BoxError>;

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, BoxError>;

    async fn list_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, BoxError>;

    async fn count(&self) -> Result<u64, BoxError>;
}

#[derive(Default)]
struct Inner {
    payments: HashMap<Uuid, Payment>,
    by_order: HashMap<Uuid, Uuid>,
}

/// Map-backed store for tests and single-node runs.
#[derive(Default)]
pub struct InMemoryPaymentRepository {
    inner: RwLock<Inner>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn save(&self, payment: &Payment) -> Result<(), BoxError> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.by_order.get(&payment.order_id) {
            if *existing != payment.id {
                return Err(format!(
                    "A payment already exists for order {}",
                    payment.order_id
                )
                .into());
            }
        }
        inner.by_order.insert(payment.order_id, payment.id);
        inner.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, BoxError> {
        Ok(self.inner.read().await.payments.get(&id).cloned())
    }

    async fn find_by_order_id(&self, order_id: Uuid) -> Result<Option<Payment>, BoxError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_order
            .get(&order_id)
            .and_then(|id| inner.payments.get(id))
            .cloned())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Payment>, BoxError> {
        Ok(self
            .inner
            .read()
            .await
            .payments
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, BoxError> {
        Ok(self
            .inner
            .read()
            .await
            .payments
            .values()
            .find(|p| p.transaction_id == transaction_id)
            .cloned())
    }

    async fn list_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, BoxError> {
        Ok(self
            .inner
            .read()
            .await
            .payments
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64, BoxError> {
        Ok(self.inner.read().await.payments.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farebox_core::gateway::PaymentMethod;

    fn payment(order_id: Uuid) -> Payment {
        Payment::new(
            order_id,
            Uuid::new_v4(),
            500,
            "USD".to_string(),
            PaymentMethod::CreditCard,
            "TICKET_PURCHASE",
        )
    }

    #[tokio::test]
    async fn order_id_uniqueness_is_enforced() {
        let repo = InMemoryPaymentRepository::new();
        let order_id = Uuid::new_v4();

        let first = payment(order_id);
        repo.save(&first).await.unwrap();

        // Re-saving the same payment (status update) is fine.
        let mut updated = first.clone();
        updated.mark_processing().unwrap();
        repo.save(&updated).await.unwrap();

        // A second payment for the same order is rejected.
        let duplicate = payment(order_id);
        assert!(repo.save(&duplicate).await.is_err());

        assert_eq!(repo.count().await.unwrap(), 1);
        let found = repo.find_by_order_id(order_id).await.unwrap().unwrap();
        assert_eq!(found.status, PaymentStatus::Processing);
    }

    #[tokio::test]
    async fn transaction_id_lookup() {
        let repo = InMemoryPaymentRepository::new();
        let p = payment(Uuid::new_v4());
        repo.save(&p).await.unwrap();

        let found = repo
            .find_by_transaction_id(&p.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, p.id);
        assert!(repo
            .find_by_transaction_id("TXN-0000000000000")
            .await
            .unwrap()
            .is_none());
    }
}
