use anyhow::Result;
use serde_json::json;

use cln_plugin_proto::Plugin;

use crate::state::PluginState;

/// Stamped by the release pipeline; a plain development build reports
/// "local".
pub const PLUGIN_VERSION: &str = match option_env!("SNR_BUILD_VERSION") {
    Some(version) => version,
    None => "local",
};

pub async fn handle(
    _plugin: Plugin<PluginState>,
    _params: serde_json::Value,
) -> Result<serde_json::Value> {
    log::debug!("rpc 'snr-version' invoked");

    Ok(json!({
        "result": {
            "version": PLUGIN_VERSION,
        }
    }))
}
