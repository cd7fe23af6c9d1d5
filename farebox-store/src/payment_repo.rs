use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farebox_core::gateway::PaymentMethod;
use farebox_core::BoxError;
use farebox_payment::payment::{Payment, PaymentStatus};
use farebox_payment::repository::PaymentRepository;
use sqlx::PgPool;
use uuid::Uuid;

pub struct StorePaymentRepository {
    pool: PgPool,
}

impl StorePaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    order_id: Uuid,
    user_id: Uuid,
    amount_cents: i64,
    currency: String,
    status: String,
    payment_method: String,
    payment_type: String,
    transaction_id: String,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl PaymentRow {
    fn into_payment(self) -> Result<Payment, BoxError> {
        Ok(Payment {
            id: self.id,
            order_id: self.order_id,
            user_id: self.user_id,
            amount_cents: self.amount_cents,
            currency: self.currency,
            status: self.status.parse::<PaymentStatus>().map_err(BoxError::from)?,
            method: self
                .payment_method
                .parse::<PaymentMethod>()
                .map_err(BoxError::from)?,
            payment_type: self.payment_type,
            transaction_id: self.transaction_id,
            failure_reason: self.failure_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, order_id, user_id, amount_cents, currency, status, \
     payment_method, payment_type, transaction_id, failure_reason, created_at, updated_at, \
     completed_at";

// The UNIQUE constraint on order_id is the backstop against settling one
// order twice: a second payment row for the same order is rejected by the
// database even if two consumers race past the processor's own check.
const UPSERT_PAYMENT: &str = r#"
    INSERT INTO payments (id, order_id, user_id, amount_cents, currency, status,
                          payment_method, payment_type, transaction_id, failure_reason,
                          created_at, updated_at, completed_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
    ON CONFLICT (id) DO UPDATE SET
        status = EXCLUDED.status,
        failure_reason = EXCLUDED.failure_reason,
        updated_at = EXCLUDED.updated_at,
        completed_at = EXCLUDED.completed_at
"#;

#[async_trait]
impl PaymentRepository for StorePaymentRepository {
    async fn save(&self, payment: &Payment) -> Result<(), BoxError> {
        sqlx::query(UPSERT_PAYMENT)
            .bind(payment.id)
            .bind(payment.order_id)
            .bind(payment.user_id)
            .bind(payment.amount_cents)
            .bind(&payment.currency)
            .bind(payment.status.as_str())
            .bind(payment.method.as_str())
            .bind(&payment.payment_type)
            .bind(&payment.transaction_id)
            .bind(&payment.failure_reason)
            .bind(payment.created_at)
            .bind(payment.updated_at)
            .bind(payment.completed_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, BoxError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentRow::into_payment).transpose()
    }

    async fn find_by_order_id(&self, order_id: Uuid) -> Result<Option<Payment>, BoxError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE order_id = $1",
            SELECT_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentRow::into_payment).transpose()
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Payment>, BoxError> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, BoxError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE transaction_id = $1",
            SELECT_COLUMNS
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PaymentRow::into_payment).transpose()
    }

    async fn list_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>, BoxError> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE status = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    async fn count(&self) -> Result<u64, BoxError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(&self.pool)
            .await?;
        Ok(total as u64)
    }
}
