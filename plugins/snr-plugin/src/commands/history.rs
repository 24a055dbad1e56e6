use anyhow::{Context, Result};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use cln_plugin_proto::Plugin;

use crate::exchange::{OpenOrder, Trade};
use crate::state::PluginState;

/// Open orders and historical fills for the default instrument, keyed by
/// each entity's own identifier. Monetary fields are decimal strings,
/// timestamps an ISO-8601 `date` plus an epoch-seconds `timestamp`.
pub async fn handle(
    plugin: Plugin<PluginState>,
    _params: serde_json::Value,
) -> Result<serde_json::Value> {
    log::debug!("rpc 'snr-history' invoked");

    let state = plugin.state();
    let pair = state.config().default_pair();

    let open_orders = state.exchange().get_open_orders(&pair).await?;
    let trades = state.exchange().get_trade_history(&pair).await?;

    let mut open = serde_json::Map::new();
    for order in &open_orders {
        open.insert(order.id.clone(), open_order_json(order)?);
    }

    let mut closed = serde_json::Map::new();
    for trade in &trades {
        closed.insert(trade.id.clone(), trade_json(trade)?);
    }

    Ok(json!({
        "result": {
            "open": open,
            "closed": closed,
        }
    }))
}

fn open_order_json(order: &OpenOrder) -> Result<serde_json::Value> {
    Ok(json!({
        "id": order.id,
        "type": order.side.as_str(),
        "status": order.status.as_str(),
        "is-open": order.status.is_open(),
        "is-final": order.status.is_final(),
        "original-amount": order.original_amount.to_string(),
        "remaining-amount": order.remaining_amount.to_string(),
        "limit-price": order.limit_price.to_string(),
        "asset-pair": order.pair.to_string(),
        "ref": order.user_reference,
        "date": iso8601(&order.timestamp)?,
        "timestamp": order.timestamp.unix_timestamp(),
    }))
}

fn trade_json(trade: &Trade) -> Result<serde_json::Value> {
    Ok(json!({
        "id": trade.id,
        "type": trade.side.as_str(),
        "order-id": trade.order_id,
        "price": trade.price.to_string(),
        "original-amount": trade.original_amount.to_string(),
        "asset-pair": trade.pair.to_string(),
        "ref": trade.order_user_reference,
        "fee-amount": trade.fee.amount.to_string(),
        "fee-currency": trade.fee.currency.as_str(),
        "date": iso8601(&trade.timestamp)?,
        "timestamp": trade.timestamp.unix_timestamp(),
    }))
}

fn iso8601(timestamp: &OffsetDateTime) -> Result<String> {
    timestamp
        .format(&Rfc3339)
        .context("Failed to format timestamp")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::exchange::{OrderSide, OrderStatus};
    use rust_decimal::Decimal;
    use snr_primitives::currency::Money;

    #[test]
    fn open_order_rendering() {
        let order = OpenOrder {
            id: "abcdef-00000-000001".to_string(),
            side: OrderSide::Bid,
            status: OrderStatus::New,
            original_amount: Decimal::new(42, 2),
            remaining_amount: Decimal::new(42, 2),
            limit_price: Decimal::new(210, 1),
            pair: "BTC/USD".parse().unwrap(),
            user_reference: "0".to_string(),
            timestamp: OffsetDateTime::from_unix_timestamp(1_622_000_000).unwrap(),
        };

        let value = open_order_json(&order).unwrap();
        assert_eq!(value["type"], "BID");
        assert_eq!(value["status"], "NEW");
        assert_eq!(value["is-open"], true);
        assert_eq!(value["is-final"], false);
        assert_eq!(value["original-amount"], "0.42");
        assert_eq!(value["limit-price"], "21.0");
        assert_eq!(value["date"], "2021-05-26T03:33:20Z");
        assert_eq!(value["timestamp"], 1_622_000_000i64);
    }

    #[test]
    fn trade_rendering() {
        let trade = Trade {
            id: "abcdef-00000-000000".to_string(),
            side: OrderSide::Bid,
            order_id: "abcdef".to_string(),
            price: Decimal::new(210_000, 1),
            original_amount: Decimal::new(21, 2),
            pair: "BTC/USD".parse().unwrap(),
            order_user_reference: String::new(),
            fee: Money::new(Decimal::new(90_103, 6), "USD".parse().unwrap()),
            timestamp: OffsetDateTime::from_unix_timestamp(1_621_000_000).unwrap(),
        };

        let value = trade_json(&trade).unwrap();
        assert_eq!(value["price"], "21000.0");
        assert_eq!(value["fee-amount"], "0.090103");
        assert_eq!(value["fee-currency"], "USD");
        assert_eq!(value["date"], "2021-05-14T13:46:40Z");
        assert_eq!(value["timestamp"], 1_621_000_000i64);
    }
}
