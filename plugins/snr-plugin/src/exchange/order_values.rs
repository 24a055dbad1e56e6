use anyhow::{anyhow, Result};
use rust_decimal::{Decimal, RoundingStrategy};

use super::InstrumentMetadata;

/// Adjusts raw amounts and prices to a venue's trading constraints before
/// an order is submitted.
pub struct OrderValues {
    metadata: InstrumentMetadata,
}

impl OrderValues {
    pub fn new(metadata: InstrumentMetadata) -> Self {
        Self { metadata }
    }

    /// Truncates an amount to the venue's accepted scale. Truncation only
    /// ever shrinks the order, never inflates it.
    pub fn adjust_amount(&self, amount: Decimal) -> Decimal {
        let mut adjusted =
            amount.round_dp_with_strategy(self.metadata.amount_scale, RoundingStrategy::ToZero);
        adjusted.rescale(self.metadata.amount_scale);
        adjusted
    }

    /// Rounds a buying price up to the next tick. Rounding up keeps the
    /// price valid for the venue without ever undercutting the intent.
    pub fn adjust_price_ceiling(&self, price: Decimal) -> Result<Decimal> {
        let increment = self.metadata.price_increment;
        if increment <= Decimal::ZERO {
            return Err(anyhow!("Invalid price increment: {}", increment));
        }

        let steps = (price / increment).ceil();
        let mut adjusted = steps
            .checked_mul(increment)
            .ok_or_else(|| anyhow!("Price out of range: {}", price))?;
        adjusted.rescale(increment.scale());
        Ok(adjusted)
    }

    pub fn amount_under_minimum(&self, amount: &Decimal) -> bool {
        *amount < self.metadata.min_amount
    }

    pub fn minimum_amount(&self) -> Decimal {
        self.metadata.min_amount
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    fn values() -> OrderValues {
        OrderValues::new(InstrumentMetadata {
            min_amount: Decimal::from_str("0.00001").unwrap(),
            amount_scale: 8,
            price_increment: Decimal::from_str("0.01").unwrap(),
        })
    }

    #[test]
    fn amounts_are_truncated_and_padded_to_scale() {
        let values = values();

        let padded = values.adjust_amount(Decimal::from_str("0.00001").unwrap());
        assert_eq!(padded.to_string(), "0.00001000");

        let truncated = values.adjust_amount(Decimal::from_str("0.123456789").unwrap());
        assert_eq!(truncated.to_string(), "0.12345678");

        let exact = values.adjust_amount(Decimal::from_str("16.22000001").unwrap());
        assert_eq!(exact.to_string(), "16.22000001");
    }

    #[test]
    fn buying_price_rounds_up_to_the_tick() {
        let values = values();

        let adjusted = values
            .adjust_price_ceiling(Decimal::from_str("0.014").unwrap())
            .unwrap();
        assert_eq!(adjusted.to_string(), "0.02");

        let on_tick = values
            .adjust_price_ceiling(Decimal::from_str("21.00").unwrap())
            .unwrap();
        assert_eq!(on_tick.to_string(), "21.00");
    }

    #[test]
    fn zero_increment_is_rejected() {
        let values = OrderValues::new(InstrumentMetadata {
            min_amount: Decimal::ZERO,
            amount_scale: 8,
            price_increment: Decimal::ZERO,
        });
        assert!(values.adjust_price_ceiling(Decimal::ONE).is_err());
    }

    #[test]
    fn minimum_amount_check() {
        let values = values();
        assert!(values.amount_under_minimum(&Decimal::from_str("0.000009").unwrap()));
        assert!(!values.amount_under_minimum(&Decimal::from_str("0.00001").unwrap()));
    }
}
