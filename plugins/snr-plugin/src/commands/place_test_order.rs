use anyhow::{anyhow, Result};
use serde_json::json;

use cln_plugin_proto::Plugin;

use crate::exchange::require_supported;
use crate::exchange::service::OrderService;
use crate::state::PluginState;

/// Places a minimal, greatly undervalued limit order to validate the
/// exchange credentials and configuration without meaningful exposure.
pub async fn handle(
    plugin: Plugin<PluginState>,
    _params: serde_json::Value,
) -> Result<serde_json::Value> {
    log::debug!("rpc 'snr-placetestorder' invoked");

    let state = plugin.state();
    let pair = state.config().default_pair();
    require_supported(state.exchange().as_ref(), &pair).await?;

    let service = OrderService::new(state.exchange().clone());
    let order = service.minimum_test_limit_order(&pair).await?;
    let price = order
        .limit_price
        .ok_or_else(|| anyhow!("Test order must carry a limit price"))?;

    let order_id = state.exchange().place_order(&order).await?;

    Ok(json!({
        "result": {
            "order": {
                "id": order_id.to_string(),
                "type": order.side.as_str(),
                "asset-pair": order.pair.to_string(),
                "amount": order.amount.to_string(),
                "price": price.to_string(),
            }
        }
    }))
}
