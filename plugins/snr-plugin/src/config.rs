use std::fmt::{Display, Formatter};

use snr_primitives::currency::{CurrencyCode, CurrencyPair};

/// Process-level run options, resolved before the handshake starts.
///
/// `SNR_DRY_RUN` forces dry-run from the outside regardless of what the
/// host passes as a plugin option.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
}

impl RunOptions {
    pub fn from_env() -> Self {
        Self {
            dry_run: env_flag("SNR_DRY_RUN"),
        }
    }
}

fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(value) => !matches!(value.as_str(), "" | "0" | "false"),
        Err(_) => false,
    }
}

/// Effective settings, resolved once at `init`. Immutable afterwards and
/// only ever read by handlers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub dry_run: bool,
    pub default_fiat_currency: CurrencyCode,
}

impl RuntimeConfig {
    /// The instrument this plugin trades by default.
    pub fn default_pair(&self) -> CurrencyPair {
        CurrencyPair::btc_quoted(self.default_fiat_currency.clone())
    }

    /// Resolves the effective configuration from the bound option values
    /// and the host-supplied network.
    ///
    /// Any network other than mainnet forces dry-run, and nothing can
    /// override that: an ambiguous network must never end up placing real
    /// trades against mainnet funds. For the same reason a missing
    /// network vetoes startup entirely.
    pub fn resolve(
        declared_dry_run: bool,
        default_fiat_currency: &str,
        network: Option<&str>,
        run_options: &RunOptions,
    ) -> Result<Self, ConfigError> {
        let network = network.ok_or(ConfigError::MissingNetwork)?;

        let is_mainnet =
            network.eq_ignore_ascii_case("bitcoin") || network.eq_ignore_ascii_case("mainnet");
        let dry_run = declared_dry_run || run_options.dry_run || !is_mainnet;

        let default_fiat_currency = default_fiat_currency
            .parse()
            .map_err(|_| ConfigError::InvalidFiatCurrency(default_fiat_currency.to_string()))?;

        Ok(Self {
            dry_run,
            default_fiat_currency,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    MissingNetwork,
    InvalidFiatCurrency(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingNetwork => write!(f, "No network found"),
            ConfigError::InvalidFiatCurrency(value) => {
                write!(f, "Invalid fiat currency '{}'", value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
