use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use cln_plugin_proto::Plugin;
use snr_primitives::amounts::{MsatAmount, SatAmount};

use crate::config::RuntimeConfig;
use crate::exchange::order_values::OrderValues;
use crate::exchange::service::OrderService;
use crate::exchange::{require_supported, ExchangeGateway};
use crate::state::PluginState;

/// A completed outgoing payment. The host sends the same shape as a
/// successful `waitsendpay` result; only these fields matter here.
#[derive(Debug, Deserialize)]
struct SendpaySuccessPayload {
    // Older hosts spelled the field 'msatoshi_sent'.
    #[serde(alias = "msatoshi_sent")]
    amount_sent_msat: Option<MsatAmount>,
    payment_hash: Option<String>,
}

pub async fn handle(plugin: Plugin<PluginState>, params: serde_json::Value) -> Result<()> {
    log::debug!("Notification 'sendpay_success' received");

    let state = plugin.state();
    replace_spent_amount(state.config(), state.exchange().clone(), params).await
}

/// Re-buys what a completed payment just spent.
///
/// In dry-run mode the full submission path is still exercised, but with
/// a limit order priced far below the market so it can never fill; live
/// mode places a market order.
pub(crate) async fn replace_spent_amount(
    config: &RuntimeConfig,
    gateway: Arc<dyn ExchangeGateway>,
    params: serde_json::Value,
) -> Result<()> {
    let payload = params
        .get("sendpay_success")
        .cloned()
        .ok_or_else(|| anyhow!("Notification payload has no 'sendpay_success' field"))?;
    let payload: SendpaySuccessPayload =
        serde_json::from_value(payload).context("Failed to parse 'sendpay_success' payload")?;

    let amount_sent = payload
        .amount_sent_msat
        .ok_or_else(|| anyhow!("Could not extract 'amount_sent_msat' from payload"))?;
    log::debug!("Spent amount which needs to be replaced: {}", amount_sent);

    // One extra satoshi also covers the truncated remainder and any
    // routing-fee rounding, so the hedge never under-covers the outflow.
    let amount_to_replace = amount_sent
        .truncate_to_sat()
        .checked_add(&SatAmount::new(1))
        .ok_or_else(|| anyhow!("Replacement amount overflows"))?;

    let user_reference = payload
        .payment_hash
        .as_deref()
        .map(short_payment_reference)
        .transpose()?
        .ok_or_else(|| anyhow!("Could not extract 'payment_hash' from payload"))?;

    let pair = config.default_pair();
    require_supported(gateway.as_ref(), &pair).await?;

    let service = OrderService::new(gateway.clone());
    let order = if config.dry_run {
        service.test_limit_order(&pair, amount_to_replace).await?
    } else {
        service.market_order(&pair, amount_to_replace).await?
    }
    .with_user_reference(&user_reference);

    let metadata = gateway.instrument_metadata(&pair).await?;
    let values = OrderValues::new(metadata);
    if values.amount_under_minimum(&order.amount) {
        log::warn!(
            "Will **NOT** place order for outgoing payment. Amount is too small: {} < {}",
            order.amount,
            values.minimum_amount()
        );
        return Ok(());
    }

    log::info!("Will place order: {}", order);
    match gateway.place_order(&order).await {
        Ok(order_id) => log::info!(
            "Placed an order on {} with id '{}' and ref '{}'",
            gateway.name(),
            order_id,
            user_reference
        ),
        Err(err) => log::error!(
            "Could not place order on {} for amount {}: {:#}",
            gateway.name(),
            order.amount,
            err
        ),
    }

    Ok(())
}

/// Some venues want a small integer as user reference; the first 32 bits
/// of the payment hash give a deterministic one, so a redelivered
/// notification resolves to the same tag.
fn short_payment_reference(payment_hash: &str) -> Result<String> {
    let digits = payment_hash
        .get(..8)
        .ok_or_else(|| anyhow!("payment_hash is too short: '{}'", payment_hash))?;
    let reference = u32::from_str_radix(digits, 16)
        .with_context(|| format!("payment_hash is not hex: '{}'", payment_hash))?;
    Ok(reference.to_string())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::RunOptions;
    use crate::exchange::dummy::DummyExchange;
    use serde_json::json;

    fn dry_run_config() -> RuntimeConfig {
        RuntimeConfig::resolve(false, "USD", Some("regtest"), &RunOptions::default()).unwrap()
    }

    fn live_config() -> RuntimeConfig {
        RuntimeConfig::resolve(false, "USD", Some("bitcoin"), &RunOptions::default()).unwrap()
    }

    fn payment(amount_msat: serde_json::Value) -> serde_json::Value {
        json!({
            "sendpay_success": {
                "id": 1,
                "payment_hash": "4c3ce32565dc10ef2bd230c32802ce2fe8b007208c0a90757aa289f75c994d49",
                "amount_msat": amount_msat,
                "amount_sent_msat": amount_msat,
                "status": "complete",
            }
        })
    }

    #[tokio::test]
    async fn dry_run_places_exactly_one_limit_order() {
        let venue = Arc::new(DummyExchange::new());

        replace_spent_amount(&dry_run_config(), venue.clone(), payment(json!(1_622_000_000_000u64)))
            .await
            .unwrap();

        let placed = venue.placed_orders();
        assert_eq!(placed.len(), 1);
        assert!(placed[0].is_limit(), "dry-run must never place a market order");
        // 1622000000000 msat -> 1622000000 sat, + 1 sat margin.
        assert_eq!(placed[0].amount.to_string(), "16.22000001");
        assert_eq!(placed[0].limit_price.as_ref().unwrap().to_string(), "0.02");
    }

    #[tokio::test]
    async fn live_mode_places_a_market_order() {
        let venue = Arc::new(DummyExchange::new());

        replace_spent_amount(&live_config(), venue.clone(), payment(json!(1_622_000_000_000u64)))
            .await
            .unwrap();

        let placed = venue.placed_orders();
        assert_eq!(placed.len(), 1);
        assert!(!placed[0].is_limit());
    }

    #[test]
    fn replacement_amount_boundaries() {
        // 1000 msat truncates to 1 sat; the margin makes 2 sats.
        assert_eq!(
            MsatAmount::new(1_000)
                .truncate_to_sat()
                .checked_add(&SatAmount::new(1))
                .unwrap(),
            SatAmount::new(2)
        );
        // 1999 msat also truncates to 1 sat; the margin makes 2 sats.
        assert_eq!(
            MsatAmount::new(1_999)
                .truncate_to_sat()
                .checked_add(&SatAmount::new(1))
                .unwrap(),
            SatAmount::new(2)
        );
    }

    #[tokio::test]
    async fn below_minimum_amounts_are_skipped_without_submission() {
        let venue = Arc::new(DummyExchange::new());

        // 2 sats is far below the venue minimum of 0.00001 BTC.
        replace_spent_amount(&dry_run_config(), venue.clone(), payment(json!(1_000u64)))
            .await
            .unwrap();

        assert!(venue.placed_orders().is_empty());
    }

    #[tokio::test]
    async fn missing_amount_is_an_error_for_this_event() {
        let venue = Arc::new(DummyExchange::new());
        let params = json!({"sendpay_success": {"payment_hash": "4c3ce32565dc10ef"}});

        let err = replace_spent_amount(&dry_run_config(), venue.clone(), params)
            .await
            .expect_err("missing amount must fail the event");
        assert!(err.to_string().contains("amount_sent_msat"));
        assert!(venue.placed_orders().is_empty());
    }

    #[tokio::test]
    async fn msat_suffixed_string_amounts_are_accepted() {
        let venue = Arc::new(DummyExchange::new());

        replace_spent_amount(
            &dry_run_config(),
            venue.clone(),
            payment(json!("1622000000000msat")),
        )
        .await
        .unwrap();

        assert_eq!(venue.placed_orders().len(), 1);
    }

    #[tokio::test]
    async fn unsupported_pair_is_an_error() {
        let venue = Arc::new(DummyExchange::new());
        let config =
            RuntimeConfig::resolve(false, "JPY", Some("regtest"), &RunOptions::default()).unwrap();

        let err = replace_spent_amount(&config, venue.clone(), payment(json!(1_622_000_000_000u64)))
            .await
            .expect_err("BTC/JPY is not on the dummy venue");
        assert!(err.to_string().contains("not supported"));
        assert!(venue.placed_orders().is_empty());
    }

    #[test]
    fn user_reference_is_the_first_32_bits_of_the_hash() {
        let reference = short_payment_reference(
            "4c3ce32565dc10ef2bd230c32802ce2fe8b007208c0a90757aa289f75c994d49",
        )
        .unwrap();
        assert_eq!(reference, u32::from_str_radix("4c3ce325", 16).unwrap().to_string());

        assert!(short_payment_reference("4c3c").is_err());
        assert!(short_payment_reference("nothexol").is_err());
    }

    #[test]
    fn deprecated_field_spelling_is_accepted() {
        let payload: SendpaySuccessPayload = serde_json::from_value(json!({
            "msatoshi_sent": 1999,
            "payment_hash": "4c3ce32565dc10ef",
        }))
        .unwrap();
        assert_eq!(payload.amount_sent_msat, Some(MsatAmount::new(1999)));
    }
}
