pub mod pricing;
pub mod purchase;
pub mod repository;
pub mod ticket;
pub mod validation;

pub use pricing::{PricingCalculator, PricingConfig, PricingError, Quote};
pub use purchase::{Order, PurchaseError, PurchaseService};
pub use repository::{InMemoryTicketRepository, TicketRepository};
pub use ticket::{ScannerContext, Ticket, TicketClass, TicketError, TicketStatus};
pub use validation::{ScanRequest, TicketSnapshot, ValidationError, ValidationService};
