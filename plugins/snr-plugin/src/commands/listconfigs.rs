use anyhow::Result;
use serde_json::json;

use cln_plugin_proto::Plugin;

use crate::state::PluginState;

/// A side-effect-free projection of the resolved configuration and the
/// venue identity.
pub async fn handle(
    plugin: Plugin<PluginState>,
    _params: serde_json::Value,
) -> Result<serde_json::Value> {
    log::debug!("rpc 'snr-listconfigs' invoked");

    let config = plugin.state().config();
    let exchange = plugin.state().exchange();

    Ok(json!({
        "result": {
            "dry-run": config.dry_run,
            "fiat-currency": {
                "default": config.default_fiat_currency.as_str(),
            },
            "exchange": {
                "name": exchange.name(),
                "host": exchange.host(),
            },
        }
    }))
}
