use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod payments;
pub mod state;
pub mod tickets;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .route("/v1/tickets/purchase", post(tickets::purchase_tickets))
        .route("/v1/tickets/validate", post(tickets::validate_ticket))
        .route("/v1/tickets/{id}/activate", post(tickets::activate_ticket))
        .route("/v1/tickets/{id}", get(tickets::get_ticket))
        .route("/v1/users/{user_id}/tickets", get(tickets::list_user_tickets))
        .route("/v1/payments/stats", get(payments::payment_stats))
        .route(
            "/v1/payments/order/{order_id}",
            get(payments::get_payment_by_order),
        )
        .route(
            "/v1/payments/transaction/{transaction_id}",
            get(payments::get_payment_by_transaction),
        )
        .route(
            "/v1/users/{user_id}/payments",
            get(payments::list_user_payments),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
