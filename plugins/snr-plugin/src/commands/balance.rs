use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use serde_json::json;

use cln_plugin_proto::Plugin;

use crate::exchange::{BalanceDetail, Wallet};
use crate::state::PluginState;

/// Account balances per wallet, limited to strictly positive totals.
///
/// An empty wallet set is reported as an error so callers can tell
/// "no money" apart from "the venue returned nothing".
pub async fn handle(
    plugin: Plugin<PluginState>,
    _params: serde_json::Value,
) -> Result<serde_json::Value> {
    log::debug!("rpc 'snr-balance' invoked");

    let wallets = plugin.state().exchange().get_balances().await?;
    if wallets.is_empty() {
        return Err(anyhow!("There is no wallet available."));
    }

    let mut result = serde_json::Map::new();
    for wallet in &wallets {
        result.insert(wallet_key(wallet), wallet_json(wallet));
    }

    Ok(json!({ "result": result }))
}

/// The venue's default wallet may carry no identifier; the host expects
/// the "_" sentinel as its key.
fn wallet_key(wallet: &Wallet) -> String {
    wallet
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| String::from("_"))
}

fn wallet_json(wallet: &Wallet) -> serde_json::Value {
    let mut balances = serde_json::Map::new();
    for (currency, balance) in &wallet.balances {
        if balance.total <= Decimal::ZERO {
            continue;
        }
        balances.insert(currency.to_string(), balance_json(balance));
    }

    json!({
        "id": wallet.id,
        "name": wallet.name,
        "balances": balances,
    })
}

fn balance_json(balance: &BalanceDetail) -> serde_json::Value {
    json!({
        "available": balance.available.to_string(),
        "available-for-withdrawal": balance.available_for_withdrawal.to_string(),
        "borrowed": balance.borrowed.to_string(),
        "depositing": balance.depositing.to_string(),
        "frozen": balance.frozen.to_string(),
        "loaned": balance.loaned.to_string(),
        "total": balance.total.to_string(),
        "withdrawing": balance.withdrawing.to_string(),
    })
}
