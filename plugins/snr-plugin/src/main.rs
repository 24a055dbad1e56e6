use std::sync::Arc;

use anyhow::Result;

use snr_plugin::config::RunOptions;
use snr_plugin::exchange::dummy::DummyExchange;

#[tokio::main]
async fn main() -> Result<()> {
    let run_options = RunOptions::from_env();

    // Real venue connectors plug in behind ExchangeGateway; the in-tree
    // venue is the demo one.
    let exchange = Arc::new(DummyExchange::new());

    snr_plugin::run(
        tokio::io::stdin(),
        tokio::io::stdout(),
        run_options,
        exchange,
    )
    .await
}
