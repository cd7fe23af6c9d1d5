use std::sync::Arc;

use farebox_payment::PaymentProcessor;
use farebox_shared::{PaymentProcessedEvent, TicketPurchasedEvent, SCHEMA_VERSION};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use tracing::{error, info, warn};

/// Consumes purchase-settlement events and drives each one through the
/// payment processor. The bus delivers per order id in order, one consumer
/// at a time; a failed handler is logged and the redelivery retries it.
pub async fn start_settlement_worker(
    brokers: String,
    group_id: String,
    topic: String,
    processor: Arc<PaymentProcessor>,
) {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &brokers)
        .set("group.id", &group_id)
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "earliest")
        .create()
        .expect("Consumer creation failed");

    consumer
        .subscribe(&[topic.as_str()])
        .expect("Can't subscribe");

    info!("Settlement worker started, listening for ticket purchases...");

    loop {
        match consumer.recv().await {
            Err(e) => error!("Kafka error: {}", e),
            Ok(m) => {
                let Some(Ok(payload)) = m.payload_view::<str>() else {
                    warn!("Skipping settlement message without a UTF-8 payload");
                    continue;
                };

                match serde_json::from_str::<TicketPurchasedEvent>(payload) {
                    Ok(event) if event.schema_version == SCHEMA_VERSION => {
                        if let Err(e) = processor.handle_ticket_purchased(&event).await {
                            error!(
                                "Failed to process settlement for order {}: {}",
                                event.order_id, e
                            );
                        }
                    }
                    Ok(event) => error!(
                        "Unsupported settlement schema version {} for order {}",
                        event.schema_version, event.order_id
                    ),
                    Err(e) => error!("Error decoding settlement event: {}", e),
                }
            }
        }
    }
}

/// Tails the payment-processed topic. No core service consumes these yet;
/// this keeps the loop observable until a downstream integration lands.
pub async fn start_payment_event_logger(brokers: String, group_id: String, topic: String) {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &brokers)
        .set("group.id", &group_id)
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "earliest")
        .create()
        .expect("Consumer creation failed");

    consumer
        .subscribe(&[topic.as_str()])
        .expect("Can't subscribe");

    info!("Payment event logger started...");

    loop {
        match consumer.recv().await {
            Err(e) => error!("Kafka error: {}", e),
            Ok(m) => {
                if let Some(Ok(payload)) = m.payload_view::<str>() {
                    match serde_json::from_str::<PaymentProcessedEvent>(payload) {
                        Ok(event) => info!(
                            order_id = %event.order_id,
                            transaction_id = %event.transaction_id,
                            status = %event.status,
                            "Payment processed"
                        ),
                        Err(e) => error!("Error decoding payment-processed event: {}", e),
                    }
                }
            }
        }
    }
}
