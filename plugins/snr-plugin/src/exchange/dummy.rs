use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use snr_primitives::currency::{CurrencyCode, CurrencyPair, Money};

use super::{
    BalanceDetail, ExchangeGateway, InstrumentMetadata, OpenOrder, Order, OrderId, OrderSide,
    OrderStatus, Ticker, Trade, Wallet,
};

/// A venue that should only be used while testing: fixed market data, two
/// canned wallets and a canned history. Placed orders are recorded so
/// tests can assert on what would have been submitted.
pub struct DummyExchange {
    next_order_id: AtomicU64,
    placed: Mutex<Vec<Order>>,
}

impl DummyExchange {
    pub fn new() -> Self {
        Self {
            next_order_id: AtomicU64::new(1),
            placed: Mutex::new(Vec::new()),
        }
    }

    /// Everything submitted through [`ExchangeGateway::place_order`], in
    /// submission order.
    pub fn placed_orders(&self) -> Vec<Order> {
        match self.placed.lock() {
            Ok(orders) => orders.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn balances() -> Result<BTreeMap<CurrencyCode, BalanceDetail>> {
        let mut balances = BTreeMap::new();
        balances.insert(
            CurrencyCode::btc(),
            BalanceDetail {
                total: Decimal::new(1, 10),
                ..BalanceDetail::default()
            },
        );
        balances.insert(
            "USD".parse()?,
            BalanceDetail {
                total: Decimal::new(1, 4),
                ..BalanceDetail::default()
            },
        );
        balances.insert(
            "GBP".parse()?,
            BalanceDetail {
                total: Decimal::new(10, 4),
                ..BalanceDetail::default()
            },
        );
        Ok(balances)
    }
}

impl Default for DummyExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeGateway for DummyExchange {
    fn name(&self) -> &str {
        "Dummy"
    }

    fn host(&self) -> &str {
        "localhost:8883"
    }

    async fn supported_instruments(&self) -> Result<HashSet<CurrencyPair>> {
        Ok(["BTC/USD", "BTC/EUR", "BTC/GBP"]
            .iter()
            .filter_map(|pair| pair.parse().ok())
            .collect())
    }

    async fn get_ticker(&self, _pair: &CurrencyPair) -> Result<Ticker> {
        Ok(Ticker {
            ask: Decimal::new(12, 2),
            bid: Decimal::new(14, 2),
            high: Decimal::new(15, 2),
            low: Decimal::new(17, 2),
            open: Decimal::new(18, 2),
            last: Decimal::new(16, 2),
        })
    }

    async fn get_balances(&self) -> Result<Vec<Wallet>> {
        Ok(vec![
            Wallet {
                id: None,
                name: None,
                balances: Self::balances()?,
            },
            Wallet {
                id: Some("margin".to_string()),
                name: Some("margin".to_string()),
                balances: Self::balances()?,
            },
        ])
    }

    async fn get_open_orders(&self, pair: &CurrencyPair) -> Result<Vec<OpenOrder>> {
        Ok(vec![OpenOrder {
            id: "abcdef-00000-000001".to_string(),
            side: OrderSide::Bid,
            status: OrderStatus::New,
            original_amount: Decimal::new(42, 2),
            remaining_amount: Decimal::new(42, 2),
            limit_price: Decimal::new(210, 1),
            pair: pair.clone(),
            user_reference: "0".to_string(),
            timestamp: OffsetDateTime::from_unix_timestamp(1_622_000_000)
                .context("Invalid canned timestamp")?,
        }])
    }

    async fn get_trade_history(&self, pair: &CurrencyPair) -> Result<Vec<Trade>> {
        Ok(vec![Trade {
            id: "abcdef-00000-000000".to_string(),
            side: OrderSide::Bid,
            order_id: "abcdef".to_string(),
            price: Decimal::new(210_000, 1),
            original_amount: Decimal::new(21, 2),
            pair: pair.clone(),
            order_user_reference: String::new(),
            fee: Money::new(Decimal::new(90_103, 6), "USD".parse()?),
            timestamp: OffsetDateTime::from_unix_timestamp(1_621_000_000)
                .context("Invalid canned timestamp")?,
        }])
    }

    async fn instrument_metadata(&self, _pair: &CurrencyPair) -> Result<InstrumentMetadata> {
        Ok(InstrumentMetadata {
            min_amount: Decimal::new(1, 5),
            amount_scale: 8,
            price_increment: Decimal::new(1, 2),
        })
    }

    async fn place_order(&self, order: &Order) -> Result<OrderId> {
        if let Ok(mut placed) = self.placed.lock() {
            placed.push(order.clone());
        }
        let id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        Ok(OrderId::new(id.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn canned_balances_print_exactly() {
        let balances = DummyExchange::balances().unwrap();
        let btc = balances.get(&CurrencyCode::btc()).unwrap();
        assert_eq!(btc.total.to_string(), "0.0000000001");

        let gbp = balances.get(&"GBP".parse().unwrap()).unwrap();
        assert_eq!(gbp.total.to_string(), "0.0010");
    }

    #[tokio::test]
    async fn order_ids_are_sequential() {
        let venue = DummyExchange::new();
        let order = Order {
            side: OrderSide::Bid,
            pair: "BTC/USD".parse().unwrap(),
            amount: Decimal::ONE,
            limit_price: None,
            user_reference: None,
        };

        assert_eq!(venue.place_order(&order).await.unwrap().as_str(), "1");
        assert_eq!(venue.place_order(&order).await.unwrap().as_str(), "2");
        assert_eq!(venue.placed_orders().len(), 2);
    }
}
