//! Ledger configuration, environment-driven with defaults.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::money::Amount;

/// Settings the ledger cannot derive from its inputs.
///
/// Loaded once at startup via [`LedgerConfig::from_env`]; library users
/// can also construct it directly or rely on [`Default`].
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Deposit amount used when onboarding supplies none.
    /// Overridable through `LEDGER_DEPOSIT_AMOUNT`.
    pub default_deposit_amount: Amount,
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        let default_deposit_amount = parse_env("LEDGER_DEPOSIT_AMOUNT", default_deposit_amount());
        Self {
            default_deposit_amount,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_deposit_amount: default_deposit_amount(),
        }
    }
}

fn default_deposit_amount() -> Amount {
    Amount::new(dec!(500.00)).expect("default deposit amount is positive")
}

/// Parses an environment variable as a positive amount, falling back to
/// `default` on missing, unparseable, or non-positive values.
fn parse_env(key: &str, default: Amount) -> Amount {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<Decimal>().ok())
        .and_then(|d| Amount::new(d).ok())
        .unwrap_or(default)
}
