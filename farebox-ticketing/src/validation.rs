use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use farebox_core::BoxError;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::repository::TicketRepository;
use crate::ticket::{ScannerContext, TicketError, TicketStatus};

/// A scan coming off a bus validator.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanRequest {
    pub scan_token: String,
    pub bus_id: Uuid,
    pub line: String,
}

/// What the driver's device gets back on a successful scan.
#[derive(Debug, Clone, Serialize)]
pub struct TicketSnapshot {
    pub ticket_id: Uuid,
    pub status: TicketStatus,
    pub remaining_validations: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown scan token: {0}")]
    UnknownToken(String),

    #[error(transparent)]
    Ticket(#[from] TicketError),

    #[error("Ticket store error: {0}")]
    Store(BoxError),
}

/// Consumes scan requests against the ticket store. Mutations are
/// serialized per ticket id: two buses scanning the same QR within
/// milliseconds must not both consume a SINGLE ticket's last use.
pub struct ValidationService {
    tickets: Arc<dyn TicketRepository>,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ValidationService {
    pub fn new(tickets: Arc<dyn TicketRepository>) -> Self {
        Self {
            tickets,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn validate_scan(
        &self,
        request: &ScanRequest,
    ) -> Result<TicketSnapshot, ValidationError> {
        let ticket = self
            .tickets
            .find_by_scan_token(&request.scan_token)
            .await
            .map_err(ValidationError::Store)?
            .ok_or_else(|| ValidationError::UnknownToken(request.scan_token.clone()))?;

        let lock = self.entity_lock(ticket.id).await;
        let _guard = lock.lock().await;

        // The lookup above raced other scanners; re-read under the lock.
        let mut ticket = self
            .tickets
            .find_by_scan_token(&request.scan_token)
            .await
            .map_err(ValidationError::Store)?
            .ok_or_else(|| ValidationError::UnknownToken(request.scan_token.clone()))?;

        let scanner = ScannerContext {
            bus_id: request.bus_id,
            line: request.line.clone(),
        };
        let outcome = ticket.validate(Utc::now(), &scanner);

        // Failure transitions (ACTIVE -> EXPIRED/USED) mutate the ticket
        // too, so the save happens on both paths.
        self.tickets
            .save(&ticket)
            .await
            .map_err(ValidationError::Store)?;

        match outcome {
            Ok(()) => {
                tracing::info!(
                    ticket_id = %ticket.id,
                    bus_id = %request.bus_id,
                    line = %request.line,
                    remaining = ?ticket.remaining_validations,
                    "Scan accepted"
                );
                Ok(TicketSnapshot {
                    ticket_id: ticket.id,
                    status: ticket.status,
                    remaining_validations: ticket.remaining_validations,
                })
            }
            Err(e) => {
                tracing::warn!(ticket_id = %ticket.id, error = %e, "Scan rejected");
                Err(e.into())
            }
        }
    }

    async fn entity_lock(&self, ticket_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(ticket_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryTicketRepository;
    use crate::ticket::{Ticket, TicketClass};

    async fn seeded_service(class: TicketClass) -> (Arc<ValidationService>, Ticket) {
        let repo = Arc::new(InMemoryTicketRepository::new());
        let mut ticket = Ticket::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            class,
            250,
            "USD".to_string(),
        );
        ticket.activate(Utc::now()).unwrap();
        repo.save(&ticket).await.unwrap();
        (Arc::new(ValidationService::new(repo)), ticket)
    }

    fn scan(token: &str) -> ScanRequest {
        ScanRequest {
            scan_token: token.to_string(),
            bus_id: Uuid::new_v4(),
            line: "7".to_string(),
        }
    }

    #[tokio::test]
    async fn unknown_token_is_a_typed_rejection() {
        let (svc, _) = seeded_service(TicketClass::Single).await;
        let err = svc.validate_scan(&scan("FBX-0-missing")).await.unwrap_err();
        assert!(matches!(err, ValidationError::UnknownToken(_)));
    }

    #[tokio::test]
    async fn successful_scan_returns_a_snapshot_and_persists() {
        let (svc, ticket) = seeded_service(TicketClass::Single).await;

        let snapshot = svc.validate_scan(&scan(&ticket.scan_token)).await.unwrap();
        assert_eq!(snapshot.ticket_id, ticket.id);
        assert_eq!(snapshot.status, TicketStatus::Used);
        assert_eq!(snapshot.remaining_validations, Some(0));

        // Second scan sees the persisted terminal state.
        let err = svc
            .validate_scan(&scan(&ticket.scan_token))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Ticket(TicketError::NotActive(_))
        ));
    }

    #[tokio::test]
    async fn racing_scans_consume_the_last_use_exactly_once() {
        for _ in 0..20 {
            let (svc, ticket) = seeded_service(TicketClass::Single).await;

            let a = {
                let svc = svc.clone();
                let token = ticket.scan_token.clone();
                tokio::spawn(async move { svc.validate_scan(&scan(&token)).await })
            };
            let b = {
                let svc = svc.clone();
                let token = ticket.scan_token.clone();
                tokio::spawn(async move { svc.validate_scan(&scan(&token)).await })
            };

            let results = [a.await.unwrap(), b.await.unwrap()];
            let successes = results.iter().filter(|r| r.is_ok()).count();
            assert_eq!(successes, 1, "exactly one of two racing scans may win");
        }
    }
}
