use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::exchange::ExchangeGateway;

/// Shared handler state. Cheap and safe to clone; everything inside is
/// read-only after `init`.
#[derive(Clone)]
pub struct PluginState {
    config: Arc<RuntimeConfig>,
    exchange: Arc<dyn ExchangeGateway>,
}

impl PluginState {
    pub fn new(config: RuntimeConfig, exchange: Arc<dyn ExchangeGateway>) -> Self {
        Self {
            config: Arc::new(config),
            exchange,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn exchange(&self) -> &Arc<dyn ExchangeGateway> {
        &self.exchange
    }
}
