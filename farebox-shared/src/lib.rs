pub mod models;

pub use models::events::{PaymentProcessedEvent, TicketPurchasedEvent, SCHEMA_VERSION};
