use std::collections::HashMap;

use async_trait::async_trait;
use farebox_core::BoxError;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ticket::Ticket;

/// Ticket persistence seam: CRUD by id plus the two lookups the platform
/// needs, by scan token (validation) and by order (settlement/reads).
#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn save(&self, ticket: &Ticket) -> Result<(), BoxError>;

    /// Persist every ticket of one order as a single atomic unit: either
    /// all of them become visible or none do.
    async fn save_all(&self, tickets: &[Ticket]) -> Result<(), BoxError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, BoxError>;

    async fn find_by_scan_token(&self, token: &str) -> Result<Option<Ticket>, BoxError>;

    async fn find_by_order(&self, order_id: Uuid) -> Result<Vec<Ticket>, BoxError>;

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Ticket>, BoxError>;
}

/// Map-backed store for tests and single-node runs.
#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<HashMap<Uuid, Ticket>>,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn save(&self, ticket: &Ticket) -> Result<(), BoxError> {
        self.tickets.write().await.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn save_all(&self, tickets: &[Ticket]) -> Result<(), BoxError> {
        // One write guard for the whole batch keeps the insert atomic.
        let mut guard = self.tickets.write().await;
        for ticket in tickets {
            guard.insert(ticket.id, ticket.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, BoxError> {
        Ok(self.tickets.read().await.get(&id).cloned())
    }

    async fn find_by_scan_token(&self, token: &str) -> Result<Option<Ticket>, BoxError> {
        Ok(self
            .tickets
            .read()
            .await
            .values()
            .find(|t| t.scan_token == token)
            .cloned())
    }

    async fn find_by_order(&self, order_id: Uuid) -> Result<Vec<Ticket>, BoxError> {
        Ok(self
            .tickets
            .read()
            .await
            .values()
            .filter(|t| t.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Ticket>, BoxError> {
        Ok(self
            .tickets
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::TicketClass;

    #[tokio::test]
    async fn lookup_by_scan_token_and_order() {
        let repo = InMemoryTicketRepository::new();
        let order_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let a = Ticket::new(user_id, order_id, TicketClass::Single, 250, "USD".to_string());
        let b = Ticket::new(user_id, order_id, TicketClass::Single, 250, "USD".to_string());
        repo.save_all(&[a.clone(), b.clone()]).await.unwrap();

        let found = repo.find_by_scan_token(&a.scan_token).await.unwrap().unwrap();
        assert_eq!(found.id, a.id);

        assert_eq!(repo.find_by_order(order_id).await.unwrap().len(), 2);
        assert_eq!(repo.find_by_user(user_id).await.unwrap().len(), 2);
        assert!(repo
            .find_by_scan_token("FBX-0-nonexistent")
            .await
            .unwrap()
            .is_none());
    }
}
