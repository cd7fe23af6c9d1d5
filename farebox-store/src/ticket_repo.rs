use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farebox_core::BoxError;
use farebox_ticketing::repository::TicketRepository;
use farebox_ticketing::ticket::{Ticket, TicketClass, TicketStatus};
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreTicketRepository {
    pool: PgPool,
}

impl StoreTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    user_id: Uuid,
    order_id: Uuid,
    class: String,
    status: String,
    price_cents: i64,
    currency: String,
    validity_start: Option<DateTime<Utc>>,
    validity_end: Option<DateTime<Utc>>,
    remaining_validations: Option<i32>,
    purchased_at: DateTime<Utc>,
    activated_at: Option<DateTime<Utc>>,
    scan_token: String,
}

impl TicketRow {
    fn into_ticket(self) -> Result<Ticket, BoxError> {
        Ok(Ticket {
            id: self.id,
            user_id: self.user_id,
            order_id: self.order_id,
            class: self.class.parse::<TicketClass>().map_err(BoxError::from)?,
            status: self.status.parse::<TicketStatus>().map_err(BoxError::from)?,
            price_cents: self.price_cents,
            currency: self.currency,
            validity_start: self.validity_start,
            validity_end: self.validity_end,
            remaining_validations: self.remaining_validations.map(|n| n.max(0) as u32),
            purchased_at: self.purchased_at,
            activated_at: self.activated_at,
            scan_token: self.scan_token,
        })
    }
}

const SELECT_COLUMNS: &str = "id, user_id, order_id, class, status, price_cents, currency, \
     validity_start, validity_end, remaining_validations, purchased_at, activated_at, scan_token";

const UPSERT_TICKET: &str = r#"
    INSERT INTO tickets (id, user_id, order_id, class, status, price_cents, currency,
                         validity_start, validity_end, remaining_validations,
                         purchased_at, activated_at, scan_token)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
    ON CONFLICT (id) DO UPDATE SET
        status = EXCLUDED.status,
        validity_start = EXCLUDED.validity_start,
        validity_end = EXCLUDED.validity_end,
        remaining_validations = EXCLUDED.remaining_validations,
        activated_at = EXCLUDED.activated_at
"#;

fn bind_ticket<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ticket: &'q Ticket,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(ticket.id)
        .bind(ticket.user_id)
        .bind(ticket.order_id)
        .bind(ticket.class.as_str())
        .bind(ticket.status.as_str())
        .bind(ticket.price_cents)
        .bind(&ticket.currency)
        .bind(ticket.validity_start)
        .bind(ticket.validity_end)
        .bind(ticket.remaining_validations.map(|n| n as i32))
        .bind(ticket.purchased_at)
        .bind(ticket.activated_at)
        .bind(&ticket.scan_token)
}

#[async_trait]
impl TicketRepository for StoreTicketRepository {
    async fn save(&self, ticket: &Ticket) -> Result<(), BoxError> {
        bind_ticket(sqlx::query(UPSERT_TICKET), ticket)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn save_all(&self, tickets: &[Ticket]) -> Result<(), BoxError> {
        // One transaction for the whole order: all tickets land or none do.
        let mut tx = self.pool.begin().await?;
        for ticket in tickets {
            bind_ticket(sqlx::query(UPSERT_TICKET), ticket)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Ticket>, BoxError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {} FROM tickets WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TicketRow::into_ticket).transpose()
    }

    async fn find_by_scan_token(&self, token: &str) -> Result<Option<Ticket>, BoxError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {} FROM tickets WHERE scan_token = $1",
            SELECT_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TicketRow::into_ticket).transpose()
    }

    async fn find_by_order(&self, order_id: Uuid) -> Result<Vec<Ticket>, BoxError> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {} FROM tickets WHERE order_id = $1 ORDER BY purchased_at",
            SELECT_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TicketRow::into_ticket).collect()
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Ticket>, BoxError> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {} FROM tickets WHERE user_id = $1 ORDER BY purchased_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TicketRow::into_ticket).collect()
    }
}
