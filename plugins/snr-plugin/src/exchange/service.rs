use std::sync::Arc;

use anyhow::Result;
use rust_decimal::Decimal;

use snr_primitives::amounts::SatAmount;
use snr_primitives::currency::CurrencyPair;

use super::order_values::OrderValues;
use super::{ExchangeGateway, Order, OrderSide};

/// Most venue settings carry 0.00001 BTC as the smallest order.
pub const FALLBACK_MIN_ORDER: SatAmount = SatAmount::new(1_000);

/// Test limit orders are priced at a tenth of the current bid so they are
/// valid to the venue but never expected to fill.
fn test_limit_price_factor() -> Decimal {
    Decimal::new(1, 1)
}

/// Builds orders that already respect the venue's trading constraints.
pub struct OrderService {
    gateway: Arc<dyn ExchangeGateway>,
}

impl OrderService {
    pub fn new(gateway: Arc<dyn ExchangeGateway>) -> Self {
        Self { gateway }
    }

    /// A BID market order for the given satoshi amount.
    pub async fn market_order(&self, pair: &CurrencyPair, amount: SatAmount) -> Result<Order> {
        let metadata = self.gateway.instrument_metadata(pair).await?;
        let values = OrderValues::new(metadata);

        Ok(Order {
            side: OrderSide::Bid,
            pair: pair.clone(),
            amount: values.adjust_amount(amount.to_btc()),
            limit_price: None,
            user_reference: None,
        })
    }

    /// A massively undervalued BID limit order for the given amount.
    pub async fn test_limit_order(&self, pair: &CurrencyPair, amount: SatAmount) -> Result<Order> {
        let ticker = self.gateway.get_ticker(pair).await?;
        let buying_price = ticker.bid * test_limit_price_factor();

        let metadata = self.gateway.instrument_metadata(pair).await?;
        let values = OrderValues::new(metadata);
        let adjusted_price = values.adjust_price_ceiling(buying_price)?;

        let order = self.market_order(pair, amount).await?;
        Ok(Order {
            limit_price: Some(adjusted_price),
            ..order
        })
    }

    /// A test limit order sized at the venue's minimum tradable amount,
    /// used to validate credentials without meaningful exposure.
    pub async fn minimum_test_limit_order(&self, pair: &CurrencyPair) -> Result<Order> {
        let amount = self.minimum_order_amount(pair).await?;
        self.test_limit_order(pair, amount).await
    }

    async fn minimum_order_amount(&self, pair: &CurrencyPair) -> Result<SatAmount> {
        match self.gateway.instrument_metadata(pair).await {
            Ok(metadata) => SatAmount::from_btc(metadata.min_amount),
            Err(err) => {
                log::debug!(
                    "No instrument metadata for {}, using fallback minimum: {:#}",
                    pair,
                    err
                );
                Ok(FALLBACK_MIN_ORDER)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::exchange::dummy::DummyExchange;

    fn pair() -> CurrencyPair {
        "BTC/USD".parse().unwrap()
    }

    #[tokio::test]
    async fn market_order_is_scaled_to_the_venue() {
        let service = OrderService::new(Arc::new(DummyExchange::new()));

        let order = service
            .market_order(&pair(), SatAmount::new(1_622_000_001))
            .await
            .unwrap();

        assert_eq!(order.side, OrderSide::Bid);
        assert_eq!(order.amount.to_string(), "16.22000001");
        assert!(order.limit_price.is_none());
    }

    #[tokio::test]
    async fn test_limit_order_is_priced_off_the_bid() {
        let service = OrderService::new(Arc::new(DummyExchange::new()));

        let order = service
            .test_limit_order(&pair(), SatAmount::new(100_000))
            .await
            .unwrap();

        // bid 0.14 * 0.1 = 0.014, rounded up to the 0.01 tick.
        assert_eq!(order.limit_price.unwrap().to_string(), "0.02");
        assert_eq!(order.amount.to_string(), "0.00100000");
    }

    #[tokio::test]
    async fn minimum_test_order_uses_the_venue_minimum() {
        let service = OrderService::new(Arc::new(DummyExchange::new()));

        let order = service.minimum_test_limit_order(&pair()).await.unwrap();
        assert_eq!(order.amount.to_string(), "0.00001000");
        assert!(order.is_limit());
    }
}
