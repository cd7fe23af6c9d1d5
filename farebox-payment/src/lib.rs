pub mod gateway;
pub mod payment;
pub mod processor;
pub mod repository;

pub use gateway::{SimulatedGateway, SimulatedGatewayConfig};
pub use payment::{Payment, PaymentError, PaymentStatus};
pub use processor::{PaymentProcessor, ProcessorError};
pub use repository::{InMemoryPaymentRepository, PaymentRepository};
