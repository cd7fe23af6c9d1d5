use std::time::Duration;

use async_trait::async_trait;
use farebox_core::gateway::{GatewayOutcome, PaymentGateway, PaymentMethod};
use farebox_core::BoxError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct SimulatedGatewayConfig {
    /// Probability in [0, 1] that a charge is approved.
    pub success_rate: f64,
    /// Artificial processing delay per charge.
    pub delay: Duration,
}

impl Default for SimulatedGatewayConfig {
    fn default() -> Self {
        Self {
            success_rate: 0.95,
            delay: Duration::from_millis(500),
        }
    }
}

/// Stand-in for a real payment provider: waits a bounded delay, then draws
/// approval at the configured rate. The delay holds no shared state; the
/// RNG lock is taken only after the sleep.
pub struct SimulatedGateway {
    config: SimulatedGatewayConfig,
    rng: Mutex<StdRng>,
}

impl SimulatedGateway {
    pub fn new(config: SimulatedGatewayConfig) -> Self {
        Self {
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic draw sequence for tests.
    pub fn with_seed(config: SimulatedGatewayConfig, seed: u64) -> Self {
        Self {
            config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn process(
        &self,
        amount_cents: i64,
        currency: &str,
        method: PaymentMethod,
    ) -> Result<GatewayOutcome, BoxError> {
        tracing::debug!(
            amount_cents,
            currency,
            method = method.as_str(),
            "Simulating payment gateway call"
        );

        tokio::time::sleep(self.config.delay).await;

        let draw: f64 = self.rng.lock().await.gen();
        if draw < self.config.success_rate {
            tracing::debug!("Payment gateway: APPROVED");
            Ok(GatewayOutcome::Approved)
        } else {
            tracing::warn!("Payment gateway: DECLINED");
            Ok(GatewayOutcome::Declined {
                reason: "Simulated payment failure".to_string(),
            })
        }
    }
}
