use std::net::SocketAddr;
use std::sync::Arc;

use farebox_api::{app, worker, AppState};
use farebox_payment::repository::PaymentRepository;
use farebox_payment::{InMemoryPaymentRepository, PaymentProcessor, SimulatedGateway};
use farebox_ticketing::repository::TicketRepository;
use farebox_ticketing::{
    InMemoryTicketRepository, PricingCalculator, PurchaseService, ValidationService,
};
use farebox_store::{DbClient, EventProducer, StorePaymentRepository, StoreTicketRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farebox_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = farebox_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Farebox API on port {}", config.server.port);

    // Kafka Connection
    let producer =
        Arc::new(EventProducer::new(&config.kafka.brokers).expect("Failed to create Kafka producer"));

    // Stores: Postgres when configured, in-memory otherwise
    let (tickets, payments): (Arc<dyn TicketRepository>, Arc<dyn PaymentRepository>) =
        match &config.database.url {
            Some(url) => {
                let db = DbClient::new(url).await.expect("Failed to connect to Postgres");
                db.migrate().await.expect("Failed to run migrations");
                (
                    Arc::new(StoreTicketRepository::new(db.pool.clone())),
                    Arc::new(StorePaymentRepository::new(db.pool.clone())),
                )
            }
            None => {
                tracing::warn!("No database configured; running on in-memory stores");
                (
                    Arc::new(InMemoryTicketRepository::new()),
                    Arc::new(InMemoryPaymentRepository::new()),
                )
            }
        };

    let purchase = Arc::new(PurchaseService::new(
        tickets.clone(),
        PricingCalculator::new(config.pricing.to_pricing_config()),
        producer.clone(),
        config.kafka.ticket_purchased_topic.clone(),
    ));
    let validation = Arc::new(ValidationService::new(tickets.clone()));

    let gateway = Arc::new(SimulatedGateway::new(config.gateway.to_gateway_config()));
    let processor = Arc::new(PaymentProcessor::new(
        payments.clone(),
        gateway,
        producer.clone(),
        config.kafka.payment_processed_topic.clone(),
    ));

    tokio::spawn(worker::start_settlement_worker(
        config.kafka.brokers.clone(),
        config.kafka.group_id.clone(),
        config.kafka.ticket_purchased_topic.clone(),
        processor,
    ));
    tokio::spawn(worker::start_payment_event_logger(
        config.kafka.brokers.clone(),
        format!("{}-events", config.kafka.group_id),
        config.kafka.payment_processed_topic.clone(),
    ));

    let app_state = AppState {
        tickets,
        payments,
        purchase,
        validation,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
