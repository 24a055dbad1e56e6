use cln_plugin_proto::options::{ConfigOption, Value};

pub const DRY_RUN: &str = "snr-dry-run";
pub const DEFAULT_FIAT_CURRENCY: &str = "snr-default-fiat-currency";

pub const DEFAULT_FIAT_CURRENCY_VALUE: &str = "USD";

pub fn snr_dry_run() -> ConfigOption {
    ConfigOption::new(
        DRY_RUN,
        Value::Flag(false),
        "Enable dry run. Trades are executed against a demo exchange.",
    )
}

pub fn snr_default_fiat_currency() -> ConfigOption {
    ConfigOption::new(
        DEFAULT_FIAT_CURRENCY,
        Value::String(DEFAULT_FIAT_CURRENCY_VALUE.to_string()),
        "The default fiat currency",
    )
}
