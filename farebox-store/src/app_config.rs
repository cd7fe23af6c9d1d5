use std::env;
use std::time::Duration;

use farebox_payment::SimulatedGatewayConfig;
use farebox_ticketing::pricing::{DiscountTier, PriceTable, PricingConfig};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub kafka: KafkaConfig,
    pub pricing: PricingRules,
    pub gateway: GatewayRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Absent means run on the in-memory store (tests, local demos).
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub group_id: String,
    pub ticket_purchased_topic: String,
    pub payment_processed_topic: String,
}

/// Fares and bulk discounts. Explicit configuration, not ambient
/// constants: every deployment names its own table.
#[derive(Debug, Deserialize, Clone)]
pub struct PricingRules {
    pub currency: String,
    pub single_cents: i64,
    pub daily_cents: i64,
    pub weekly_cents: i64,
    pub monthly_cents: i64,
    pub bulk_tiers: Vec<BulkTier>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BulkTier {
    pub min_quantity: u32,
    pub percent: u32,
}

impl PricingRules {
    pub fn to_pricing_config(&self) -> PricingConfig {
        PricingConfig {
            prices: PriceTable {
                single_cents: self.single_cents,
                daily_cents: self.daily_cents,
                weekly_cents: self.weekly_cents,
                monthly_cents: self.monthly_cents,
            },
            currency: self.currency.clone(),
            tiers: self
                .bulk_tiers
                .iter()
                .map(|t| DiscountTier {
                    min_quantity: t.min_quantity,
                    percent: t.percent,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayRules {
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_success_rate() -> f64 {
    0.95
}

fn default_delay_ms() -> u64 {
    500
}

impl GatewayRules {
    pub fn to_gateway_config(&self) -> SimulatedGatewayConfig {
        SimulatedGatewayConfig {
            success_rate: self.success_rate,
            delay: Duration::from_millis(self.delay_ms),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file (optional)
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file not checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of FAREBOX)
            // Eg. `FAREBOX_SERVER__PORT=8080` would set `server.port`
            .add_source(config::Environment::with_prefix("FAREBOX").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
