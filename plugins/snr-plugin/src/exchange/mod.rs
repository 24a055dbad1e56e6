pub mod dummy;
pub mod order_values;
pub mod service;

use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use snr_primitives::currency::{CurrencyCode, CurrencyPair, Money};

/// Market snapshot for one instrument. All prices are exact decimals in
/// the quote currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticker {
    pub ask: Decimal,
    pub bid: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub open: Decimal,
    pub last: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceDetail {
    pub available: Decimal,
    pub available_for_withdrawal: Decimal,
    pub borrowed: Decimal,
    pub depositing: Decimal,
    pub frozen: Decimal,
    pub loaned: Decimal,
    pub total: Decimal,
    pub withdrawing: Decimal,
}

/// One venue wallet. The default wallet of some venues carries no
/// identifier at all.
#[derive(Debug, Clone, Default)]
pub struct Wallet {
    pub id: Option<String>,
    pub name: Option<String>,
    pub balances: BTreeMap<CurrencyCode, BalanceDetail>,
}

/// Venue trading constraints for one instrument.
#[derive(Debug, Clone)]
pub struct InstrumentMetadata {
    /// Smallest order size in the base asset.
    pub min_amount: Decimal,
    /// Number of decimal digits the venue accepts on amounts.
    pub amount_scale: u32,
    /// Price tick size in the quote currency.
    pub price_increment: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Bid,
    Ask,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Bid => "BID",
            OrderSide::Ask => "ASK",
        }
    }
}

impl Display for OrderSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Canceled => "CANCELED",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::PartiallyFilled)
    }

    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Canceled)
    }
}

/// An order to be submitted: a market order, or a limit order when
/// `limit_price` is set. Constructed per event, submitted once, discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub side: OrderSide,
    pub pair: CurrencyPair,
    /// Base asset amount, already adjusted to the venue scale.
    pub amount: Decimal,
    pub limit_price: Option<Decimal>,
    /// Deterministic venue deduplication tag.
    pub user_reference: Option<String>,
}

impl Order {
    pub fn is_limit(&self) -> bool {
        self.limit_price.is_some()
    }

    pub fn kind(&self) -> &'static str {
        if self.is_limit() {
            "limit"
        } else {
            "market"
        }
    }

    pub fn with_user_reference(mut self, reference: &str) -> Self {
        self.user_reference = Some(reference.to_string());
        self
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.limit_price {
            Some(price) => write!(
                f,
                "{} {} {} {} @ {}",
                self.kind(),
                self.side,
                self.amount,
                self.pair,
                price
            ),
            None => write!(
                f,
                "{} {} {} {}",
                self.kind(),
                self.side,
                self.amount,
                self.pair
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: String) -> Self {
        OrderId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An order resting on the venue's book.
#[derive(Debug, Clone)]
pub struct OpenOrder {
    pub id: String,
    pub side: OrderSide,
    pub status: OrderStatus,
    pub original_amount: Decimal,
    pub remaining_amount: Decimal,
    pub limit_price: Decimal,
    pub pair: CurrencyPair,
    pub user_reference: String,
    pub timestamp: OffsetDateTime,
}

/// A historical fill.
#[derive(Debug, Clone)]
pub struct Trade {
    pub id: String,
    pub side: OrderSide,
    pub order_id: String,
    pub price: Decimal,
    pub original_amount: Decimal,
    pub pair: CurrencyPair,
    pub order_user_reference: String,
    pub fee: Money,
    pub timestamp: OffsetDateTime,
}

/// The venue collaborator. Calls may fail with connectivity or validation
/// errors; nothing here retries — retry policy, if any, belongs to the
/// implementation behind this trait.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    fn name(&self) -> &str;

    fn host(&self) -> &str;

    async fn supported_instruments(&self) -> Result<HashSet<CurrencyPair>>;

    async fn get_ticker(&self, pair: &CurrencyPair) -> Result<Ticker>;

    async fn get_balances(&self) -> Result<Vec<Wallet>>;

    async fn get_open_orders(&self, pair: &CurrencyPair) -> Result<Vec<OpenOrder>>;

    async fn get_trade_history(&self, pair: &CurrencyPair) -> Result<Vec<Trade>>;

    async fn instrument_metadata(&self, pair: &CurrencyPair) -> Result<InstrumentMetadata>;

    async fn place_order(&self, order: &Order) -> Result<OrderId>;
}

/// Fails with a structured error unless the venue trades the pair. Every
/// trade-related call goes through this check first.
pub async fn require_supported(gateway: &dyn ExchangeGateway, pair: &CurrencyPair) -> Result<()> {
    let supported = gateway.supported_instruments().await?;
    if !supported.contains(pair) {
        return Err(anyhow!("Currency pair is not supported: {}", pair));
    }
    Ok(())
}
