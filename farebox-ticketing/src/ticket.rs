use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product type purchased, determining price and validity duration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketClass {
    Single,
    Daily,
    Weekly,
    Monthly,
}

impl TicketClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketClass::Single => "SINGLE",
            TicketClass::Daily => "DAILY",
            TicketClass::Weekly => "WEEKLY",
            TicketClass::Monthly => "MONTHLY",
        }
    }

    /// End of the validity window for a ticket activated at `start`.
    /// MONTHLY follows the calendar, not a fixed number of days.
    pub fn validity_end_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TicketClass::Single => start + Duration::hours(2),
            TicketClass::Daily => start + Duration::days(1),
            TicketClass::Weekly => start + Duration::days(7),
            TicketClass::Monthly => start
                .checked_add_months(Months::new(1))
                .unwrap_or(start + Duration::days(31)),
        }
    }

    /// Uses granted at activation. `None` means unlimited for the validity
    /// window; only the window bounds a period pass.
    pub fn initial_validations(&self) -> Option<u32> {
        match self {
            TicketClass::Single => Some(1),
            TicketClass::Daily | TicketClass::Weekly | TicketClass::Monthly => None,
        }
    }
}

impl std::str::FromStr for TicketClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SINGLE" => Ok(TicketClass::Single),
            "DAILY" => Ok(TicketClass::Daily),
            "WEEKLY" => Ok(TicketClass::Weekly),
            "MONTHLY" => Ok(TicketClass::Monthly),
            other => Err(format!("Unknown ticket class: {}", other)),
        }
    }
}

/// Ticket lifecycle status. Transitions only move forward:
/// PURCHASED -> ACTIVE -> {USED, EXPIRED}.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Purchased,
    Active,
    Used,
    Expired,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Purchased => "PURCHASED",
            TicketStatus::Active => "ACTIVE",
            TicketStatus::Used => "USED",
            TicketStatus::Expired => "EXPIRED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketStatus::Used | TicketStatus::Expired)
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PURCHASED" => Ok(TicketStatus::Purchased),
            "ACTIVE" => Ok(TicketStatus::Active),
            "USED" => Ok(TicketStatus::Used),
            "EXPIRED" => Ok(TicketStatus::Expired),
            other => Err(format!("Unknown ticket status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TicketError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Ticket is not active. Status: {0}")]
    NotActive(String),

    #[error("Ticket has expired")]
    Expired,

    #[error("No validations remaining")]
    NoValidationsRemaining,
}

/// Where a scan happened. Carried through validation for analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerContext {
    pub bus_id: Uuid,
    pub line: String,
}

/// One unit of transit access, grouped into an order at purchase time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub class: TicketClass,
    pub status: TicketStatus,
    pub price_cents: i64,
    pub currency: String,
    pub validity_start: Option<DateTime<Utc>>,
    pub validity_end: Option<DateTime<Utc>>,
    /// `None` means unlimited (period passes). Set at activation.
    pub remaining_validations: Option<u32>,
    pub purchased_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    /// Opaque string encoded into the rider's QR code; unique per ticket.
    pub scan_token: String,
}

impl Ticket {
    pub fn new(
        user_id: Uuid,
        order_id: Uuid,
        class: TicketClass,
        price_cents: i64,
        currency: String,
    ) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        Self {
            id,
            user_id,
            order_id,
            class,
            status: TicketStatus::Purchased,
            price_cents,
            currency,
            validity_start: None,
            validity_end: None,
            remaining_validations: None,
            purchased_at: now,
            activated_at: None,
            scan_token: format!("FBX-{}-{}", now.timestamp(), id.simple()),
        }
    }

    /// Start the validity period. Legal only from PURCHASED.
    pub fn activate(&mut self, now: DateTime<Utc>) -> Result<(), TicketError> {
        if self.status != TicketStatus::Purchased {
            return Err(TicketError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: "ACTIVE".to_string(),
            });
        }

        self.status = TicketStatus::Active;
        self.activated_at = Some(now);
        self.validity_start = Some(now);
        self.validity_end = Some(self.class.validity_end_from(now));
        self.remaining_validations = self.class.initial_validations();
        Ok(())
    }

    /// Consume one use at a scanner. Failure transitions (EXPIRED, USED)
    /// mutate the ticket; callers must persist it whether or not the scan
    /// was accepted.
    pub fn validate(
        &mut self,
        now: DateTime<Utc>,
        scanner: &ScannerContext,
    ) -> Result<(), TicketError> {
        if self.status != TicketStatus::Active {
            return Err(TicketError::NotActive(self.status.as_str().to_string()));
        }

        if let Some(end) = self.validity_end {
            if now > end {
                self.status = TicketStatus::Expired;
                return Err(TicketError::Expired);
            }
        }

        if let Some(remaining) = self.remaining_validations {
            if remaining == 0 {
                self.status = TicketStatus::Used;
                return Err(TicketError::NoValidationsRemaining);
            }
            self.remaining_validations = Some(remaining - 1);
        }

        if self.class == TicketClass::Single && self.remaining_validations == Some(0) {
            self.status = TicketStatus::Used;
        }

        tracing::debug!(
            ticket_id = %self.id,
            bus_id = %scanner.bus_id,
            line = %scanner.line,
            timestamp = %now,
            "Ticket validated"
        );
        Ok(())
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.status == TicketStatus::Active
            && self.validity_end.map(|end| now <= end).unwrap_or(false)
            && self.remaining_validations.map(|r| r > 0).unwrap_or(true)
    }
}
