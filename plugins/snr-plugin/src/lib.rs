//! spend-and-replace: a Core Lightning plugin that re-buys what an
//! outgoing payment spent by placing a replacement order on a trading
//! venue, keeping net exposure roughly constant.

pub mod commands;
pub mod config;
pub mod exchange;
pub mod options;
pub mod state;
pub mod subscriptions;

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncRead, AsyncWrite};

use cln_plugin_proto::Builder;

use crate::config::{RunOptions, RuntimeConfig};
use crate::exchange::ExchangeGateway;
use crate::state::PluginState;

/// Wires up the plugin and drives it until the host shuts it down.
///
/// Generic over the streams so the whole loop can run against in-memory
/// pipes under test exactly as it runs against stdio in production.
pub async fn run<I, O>(
    input: I,
    output: O,
    run_options: RunOptions,
    exchange: Arc<dyn ExchangeGateway>,
) -> Result<()>
where
    I: AsyncRead + Send + Unpin + 'static,
    O: AsyncWrite + Send + Unpin + 'static,
{
    let builder = Builder::<PluginState, _, _>::new(input, output)
        .option(options::snr_dry_run())
        .option(options::snr_default_fiat_currency())
        .rpcmethod(
            "snr-listconfigs",
            "Command to list all configuration options.",
            commands::listconfigs::handle,
        )
        .rpcmethod(
            "snr-version",
            "Command to print the plugin version.",
            commands::version::handle,
        )
        .rpcmethod_with_usage(
            "snr-ticker",
            "[fiat-currency]",
            "Get the ticker representing the current exchange rate for the provided currency.",
            commands::ticker::handle,
        )
        .rpcmethod(
            "snr-balance",
            "Get the balance of your account.",
            commands::balance::handle,
        )
        .rpcmethod(
            "snr-history",
            "Get the trade history of your account.",
            commands::history::handle,
        )
        .rpcmethod(
            "snr-placetestorder",
            "Place a minimal, greatly undervalued limit order to test if exchange settings are working properly.",
            commands::place_test_order::handle,
        )
        .subscribe("shutdown", subscriptions::shutdown::handle)
        .subscribe("sendpay_success", subscriptions::sendpay_success::handle);

    let configured = match builder.configure().await? {
        Some(configured) => configured,
        None => return Ok(()),
    };

    let declared_dry_run = configured
        .option(options::DRY_RUN)
        .and_then(|value| value.as_bool())
        .unwrap_or(false);
    let default_fiat_currency = configured
        .option(options::DEFAULT_FIAT_CURRENCY)
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_else(|| options::DEFAULT_FIAT_CURRENCY_VALUE.to_string());
    let network = configured.configuration().network;

    let config = match RuntimeConfig::resolve(
        declared_dry_run,
        &default_fiat_currency,
        network.as_deref(),
        &run_options,
    ) {
        Ok(config) => config,
        Err(err) => return configured.disable(&err.to_string()).await,
    };

    log::info!(
        "spend-and-replace initialized: dry-run={}, default fiat currency {}, venue {}",
        config.dry_run,
        config.default_fiat_currency,
        exchange.name()
    );

    let plugin = configured.start(PluginState::new(config, exchange)).await?;
    plugin.join().await
}
