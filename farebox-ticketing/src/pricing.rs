use serde::{Deserialize, Serialize};

use crate::ticket::TicketClass;

/// Base fares in minor units, keyed by ticket class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTable {
    pub single_cents: i64,
    pub daily_cents: i64,
    pub weekly_cents: i64,
    pub monthly_cents: i64,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self {
            single_cents: 250,
            daily_cents: 1_000,
            weekly_cents: 3_500,
            monthly_cents: 12_000,
        }
    }
}

impl PriceTable {
    pub fn base_cents(&self, class: TicketClass) -> i64 {
        match class {
            TicketClass::Single => self.single_cents,
            TicketClass::Daily => self.daily_cents,
            TicketClass::Weekly => self.weekly_cents,
            TicketClass::Monthly => self.monthly_cents,
        }
    }
}

/// A bulk discount step: orders of at least `min_quantity` tickets get
/// `percent` off the gross total. The highest qualifying step wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountTier {
    pub min_quantity: u32,
    pub percent: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub prices: PriceTable,
    pub currency: String,
    pub tiers: Vec<DiscountTier>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            prices: PriceTable::default(),
            currency: "USD".to_string(),
            tiers: vec![
                DiscountTier {
                    min_quantity: 10,
                    percent: 10,
                },
                DiscountTier {
                    min_quantity: 5,
                    percent: 5,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("Quantity must be a positive integer, got {0}")]
    InvalidQuantity(u32),
}

/// A priced order: the discounted total and its per-ticket breakdown.
/// The breakdown always sums to the total exactly.
#[derive(Debug, Clone)]
pub struct Quote {
    pub total_cents: i64,
    pub per_ticket_cents: Vec<i64>,
    pub currency: String,
}

pub struct PricingCalculator {
    config: PricingConfig,
}

impl PricingCalculator {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    /// Discounted total for `quantity` tickets of one class.
    pub fn total_cents(&self, class: TicketClass, quantity: u32) -> Result<i64, PricingError> {
        if quantity == 0 {
            return Err(PricingError::InvalidQuantity(quantity));
        }

        let gross = self.config.prices.base_cents(class) * i64::from(quantity);

        let percent = self
            .config
            .tiers
            .iter()
            .filter(|tier| quantity >= tier.min_quantity)
            .map(|tier| tier.percent)
            .max()
            .unwrap_or(0);

        let discount = div_round_half_up(gross * i64::from(percent), 100);
        Ok(gross - discount)
    }

    /// Total plus the even per-ticket split.
    pub fn quote(&self, class: TicketClass, quantity: u32) -> Result<Quote, PricingError> {
        let total_cents = self.total_cents(class, quantity)?;
        Ok(Quote {
            total_cents,
            per_ticket_cents: split_evenly(total_cents, quantity),
            currency: self.config.currency.clone(),
        })
    }
}

impl Default for PricingCalculator {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

/// Divide `total_cents` into `quantity` shares, rounding each share half-up
/// to the minor unit. The rounding remainder lands on the last share so the
/// shares always sum back to `total_cents`.
pub fn split_evenly(total_cents: i64, quantity: u32) -> Vec<i64> {
    let n = i64::from(quantity.max(1));
    let per = div_round_half_up(total_cents, n);

    let mut shares = vec![per; quantity.max(1) as usize];
    if let Some(last) = shares.last_mut() {
        *last = total_cents - per * (n - 1);
    }
    shares
}

fn div_round_half_up(numerator: i64, denominator: i64) -> i64 {
    (2 * numerator + denominator) / (2 * denominator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_quantity() {
        let calc = PricingCalculator::default();
        assert_eq!(
            calc.total_cents(TicketClass::Single, 0),
            Err(PricingError::InvalidQuantity(0))
        );
    }

    #[test]
    fn discount_thresholds_apply_exactly_at_five_and_ten() {
        let calc = PricingCalculator::default();

        // 4 singles: no discount.
        assert_eq!(calc.total_cents(TicketClass::Single, 4).unwrap(), 1_000);
        // 5 singles: 5% off 1250 = 62.5, rounded half-up to 63.
        assert_eq!(calc.total_cents(TicketClass::Single, 5).unwrap(), 1_187);
        // 9 singles: still the 5% tier.
        assert_eq!(calc.total_cents(TicketClass::Single, 9).unwrap(), 2_137);
        // 10 singles: 10% off 2500.
        assert_eq!(calc.total_cents(TicketClass::Single, 10).unwrap(), 2_250);
    }

    #[test]
    fn totals_are_nonnegative_and_monotonic_in_quantity() {
        let calc = PricingCalculator::default();
        for class in [
            TicketClass::Single,
            TicketClass::Daily,
            TicketClass::Weekly,
            TicketClass::Monthly,
        ] {
            let mut previous = 0;
            for quantity in 1..=25 {
                let total = calc.total_cents(class, quantity).unwrap();
                assert!(total >= previous, "{:?} q={}", class, quantity);
                previous = total;
            }
        }
    }

    #[test]
    fn split_sums_back_to_the_total() {
        // 750 over 3: clean thirds.
        assert_eq!(split_evenly(750, 3), vec![250, 250, 250]);

        // 1000 over 3: 333.33 rounds to 333, remainder on the last share.
        assert_eq!(split_evenly(1_000, 3), vec![333, 333, 334]);

        // 5-ticket discounted total from the table above.
        let shares = split_evenly(1_187, 5);
        assert_eq!(shares.iter().sum::<i64>(), 1_187);
        assert_eq!(shares, vec![237, 237, 237, 237, 239]);
    }

    #[test]
    fn quote_breakdown_always_reconciles() {
        let calc = PricingCalculator::default();
        for quantity in 1..=40 {
            let quote = calc.quote(TicketClass::Weekly, quantity).unwrap();
            assert_eq!(quote.per_ticket_cents.len(), quantity as usize);
            assert_eq!(
                quote.per_ticket_cents.iter().sum::<i64>(),
                quote.total_cents,
                "q={}",
                quantity
            );
        }
    }
}
