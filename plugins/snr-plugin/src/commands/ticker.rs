use anyhow::{anyhow, Result};
use serde_json::json;

use cln_plugin_proto::Plugin;
use snr_primitives::currency::{CurrencyCode, CurrencyPair};

use crate::exchange::require_supported;
use crate::state::PluginState;

/// Current exchange rate for BTC against the requested quote currency
/// (optional single positional parameter, defaults to the configured one).
/// All prices go over the wire as exact-decimal strings.
pub async fn handle(
    plugin: Plugin<PluginState>,
    params: serde_json::Value,
) -> Result<serde_json::Value> {
    log::debug!("rpc 'snr-ticker' invoked: {}", params);

    let state = plugin.state();
    let quote = quote_currency(&params, &state.config().default_fiat_currency)?;
    let pair = CurrencyPair::btc_quoted(quote);

    require_supported(state.exchange().as_ref(), &pair).await?;
    let ticker = state.exchange().get_ticker(&pair).await?;

    let mut result = serde_json::Map::new();
    result.insert(
        pair.to_string(),
        json!({
            "ask": ticker.ask.to_string(),
            "bid": ticker.bid.to_string(),
            "high": ticker.high.to_string(),
            "low": ticker.low.to_string(),
            "open": ticker.open.to_string(),
            "last": ticker.last.to_string(),
        }),
    );

    Ok(json!({ "result": result }))
}

fn quote_currency(params: &serde_json::Value, default: &CurrencyCode) -> Result<CurrencyCode> {
    match params.as_array().and_then(|array| array.first()) {
        None => Ok(default.clone()),
        Some(serde_json::Value::String(code)) => code.parse(),
        Some(other) => Err(anyhow!("Expected a currency code, got {}", other)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn usd() -> CurrencyCode {
        "USD".parse().unwrap()
    }

    #[test]
    fn missing_or_empty_params_fall_back_to_the_default() {
        assert_eq!(quote_currency(&json!([]), &usd()).unwrap(), usd());
        assert_eq!(quote_currency(&json!({}), &usd()).unwrap(), usd());
        assert_eq!(quote_currency(&json!(null), &usd()).unwrap(), usd());
    }

    #[test]
    fn positional_parameter_overrides_the_default() {
        let quote = quote_currency(&json!(["GBP"]), &usd()).unwrap();
        assert_eq!(quote.as_str(), "GBP");
    }

    #[test]
    fn non_string_parameter_is_refused() {
        assert!(quote_currency(&json!([42]), &usd()).is_err());
    }
}
