pub mod app_config;
pub mod database;
pub mod events;
pub mod payment_repo;
pub mod ticket_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use events::EventProducer;
pub use payment_repo::StorePaymentRepository;
pub use ticket_repo::StoreTicketRepository;
