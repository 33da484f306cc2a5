//! Governor configuration: construction surface, validation, environment loading.

use crate::{Error, Result};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Thresholds for the daily-loss circuit breaker.
#[derive(Debug, Clone)]
pub struct GovernorConfig {
    /// Maximum daily loss as a fraction of the reference balance
    /// (negative, e.g. -0.02 = -2%).
    pub daily_loss_limit: Decimal,
    /// How long trading stays blocked after an automatic trip.
    pub cooldown_seconds: i64,
    /// Balance used to convert absolute PnL into a fraction.
    pub reference_balance: Decimal,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            daily_loss_limit: Decimal::new(-2, 2), // -2% daily
            cooldown_seconds: 3600,                // 1 hour
            reference_balance: Decimal::new(1000, 0),
        }
    }
}

impl GovernorConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset. Unparseable values are rejected rather
    /// than silently defaulted.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            daily_loss_limit: parse_var("RISK_DAILY_LOSS_LIMIT", defaults.daily_loss_limit)?,
            cooldown_seconds: parse_var("RISK_COOLDOWN_SECONDS", defaults.cooldown_seconds)?,
            reference_balance: parse_var("RISK_REFERENCE_BALANCE", defaults.reference_balance)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations under which the trip evaluation is meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.reference_balance <= Decimal::ZERO {
            return Err(Error::Config {
                message: format!(
                    "reference_balance must be positive, got {}",
                    self.reference_balance
                ),
            });
        }
        if self.daily_loss_limit >= Decimal::ZERO {
            return Err(Error::Config {
                message: format!(
                    "daily_loss_limit must be negative, got {}",
                    self.daily_loss_limit
                ),
            });
        }
        if self.cooldown_seconds < 0 {
            return Err(Error::Config {
                message: format!(
                    "cooldown_seconds must not be negative, got {}",
                    self.cooldown_seconds
                ),
            });
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| Error::Config {
            message: format!("{name} has invalid value {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}
