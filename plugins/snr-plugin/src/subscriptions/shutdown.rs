use anyhow::Result;

use cln_plugin_proto::Plugin;

use crate::state::PluginState;

/// The host gives a plugin 30 seconds to exit after this notification.
/// The runtime stops the message loop once this handler returns; the
/// binary then falls out of `join` and exits cleanly.
pub async fn handle(_plugin: Plugin<PluginState>, _params: serde_json::Value) -> Result<()> {
    log::debug!("Notification 'shutdown' received");
    Ok(())
}
