use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::BoxError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    MobileWallet,
    BankTransfer,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::DebitCard => "DEBIT_CARD",
            PaymentMethod::MobileWallet => "MOBILE_WALLET",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::Cash => "CASH",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT_CARD" => Ok(PaymentMethod::CreditCard),
            "DEBIT_CARD" => Ok(PaymentMethod::DebitCard),
            "MOBILE_WALLET" => Ok(PaymentMethod::MobileWallet),
            "BANK_TRANSFER" => Ok(PaymentMethod::BankTransfer),
            "CASH" => Ok(PaymentMethod::Cash),
            other => Err(format!("Unknown payment method: {}", other)),
        }
    }
}

/// Terminal answer from a payment provider. A decline is a business
/// outcome, not an error; infrastructure problems surface as Err instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    Approved,
    Declined { reason: String },
}

/// Capability seam for payment processing. The automated settlement path
/// runs against a simulated implementation; a real provider integration
/// replaces it without touching the Payment state machine.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn process(
        &self,
        amount_cents: i64,
        currency: &str,
        method: PaymentMethod,
    ) -> Result<GatewayOutcome, BoxError>;
}
