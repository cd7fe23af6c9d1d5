use std::sync::Arc;

use farebox_payment::repository::PaymentRepository;
use farebox_ticketing::repository::TicketRepository;
use farebox_ticketing::{PurchaseService, ValidationService};

#[derive(Clone)]
pub struct AppState {
    pub tickets: Arc<dyn TicketRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub purchase: Arc<PurchaseService>,
    pub validation: Arc<ValidationService>,
}
