//! Wallet configuration
//!
//! Settings are read from an optional YAML file, then overridden by
//! environment variables, then validated:
//!
//! ```yaml
//! commission_rate: "0.015"
//! commission_account_email: commission@wallet.app
//! history_page_size: 15
//! lock_timeout_ms: 5000
//! log_level: info
//! log_json: false
//! ```
//!
//! | Variable                   | Field                      |
//! |----------------------------|----------------------------|
//! | `APP_COMMISSION_RATE`      | `commission_rate`          |
//! | `COMMISSION_ACCOUNT_EMAIL` | `commission_account_email` |

use crate::core::validation::is_valid_email;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const COMMISSION_RATE_ENV: &str = "APP_COMMISSION_RATE";
pub const COMMISSION_ACCOUNT_ENV: &str = "COMMISSION_ACCOUNT_EMAIL";

/// Configuration loading or validation failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse config: {message}")]
    Parse { message: String },

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Fraction of the gross amount taken on each transfer
    #[serde(with = "rust_decimal::serde::str")]
    pub commission_rate: Decimal,

    /// Email of the account that accumulates commissions
    pub commission_account_email: String,

    /// Rows per history page
    pub history_page_size: usize,

    /// Upper bound on waiting for a row lock
    pub lock_timeout_ms: u64,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Emit JSON log lines instead of text
    pub log_json: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            commission_rate: Decimal::new(15, 3),
            commission_account_email: "commission@wallet.app".to_string(),
            history_page_size: 15,
            lock_timeout_ms: 5_000,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl WalletConfig {
    /// Load from an optional file plus the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                Self::from_yaml(&content)?
            }
            None => Self::default(),
        };

        let config = config.with_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML; missing fields keep their defaults
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Apply overrides from a variable lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(rate) = lookup(COMMISSION_RATE_ENV) {
            self.commission_rate =
                Decimal::from_str(rate.trim()).map_err(|e| ConfigError::Invalid {
                    field: "commission_rate",
                    reason: format!("'{}' is not a decimal ({})", rate, e),
                })?;
        }
        if let Some(email) = lookup(COMMISSION_ACCOUNT_ENV) {
            self.commission_account_email = email.trim().to_string();
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.commission_rate.is_sign_negative() || self.commission_rate >= Decimal::ONE {
            return Err(ConfigError::Invalid {
                field: "commission_rate",
                reason: format!("{} is outside [0, 1)", self.commission_rate),
            });
        }
        if !is_valid_email(&self.commission_account_email) {
            return Err(ConfigError::Invalid {
                field: "commission_account_email",
                reason: format!("'{}' is not an email address", self.commission_account_email),
            });
        }
        if self.history_page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "history_page_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "lock_timeout_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
