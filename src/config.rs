//! Run settings for the calculator.
//!
//! Every knob has a documented default; values can come from a JSON
//! settings file, with command-line flags taking precedence.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// PPS rate in percent.
    #[serde(default = "default_pps_rate")]
    pub pps_rate: f64,

    /// Difficulty period to evaluate. Absent = last completed period.
    #[serde(default)]
    pub period: Option<i64>,

    /// Contracted capacity in GH/s.
    #[serde(default = "default_ghps")]
    pub ghps: f64,

    /// Electricity expenses in USD per second per GH/s.
    /// The default reflects $0.15/kWh at 100 W per 10 GH/s blade.
    #[serde(default = "default_expense_factor")]
    pub expense_factor: f64,

    /// BTC/USD exchange rate; 0 means fetch it from the price feed.
    #[serde(default)]
    pub exchange_rate: f64,

    /// bitcoind JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// RPC basic-auth user.
    #[serde(default)]
    pub rpc_user: Option<String>,

    /// RPC basic-auth password.
    #[serde(default)]
    pub rpc_pass: Option<String>,

    /// Weighted-prices feed URL.
    #[serde(default = "default_price_url")]
    pub price_url: String,
}

fn default_pps_rate() -> f64 {
    80.0
}

fn default_ghps() -> f64 {
    10.0
}

fn default_expense_factor() -> f64 {
    4.17e-7
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8332".to_string()
}

fn default_price_url() -> String {
    crate::price::WEIGHTED_PRICES_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pps_rate: default_pps_rate(),
            period: None,
            ghps: default_ghps(),
            expense_factor: default_expense_factor(),
            exchange_rate: 0.0,
            rpc_url: default_rpc_url(),
            rpc_user: None,
            rpc_pass: None,
            price_url: default_price_url(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read settings file {}", path.as_ref().display()))?;

        let settings: Settings =
            serde_json::from_str(&content).context("failed to parse settings JSON")?;

        Ok(settings)
    }

    /// Validate settings before any network work.
    pub fn validate(&self) -> Result<()> {
        if !(self.pps_rate > 0.0 && self.pps_rate <= 100.0) {
            anyhow::bail!("PPS rate must be in (0, 100], got {}", self.pps_rate);
        }
        if self.ghps <= 0.0 {
            anyhow::bail!("capacity must be positive, got {} GH/s", self.ghps);
        }
        if self.expense_factor <= 0.0 {
            anyhow::bail!(
                "expense factor must be positive, got {} USD/sec/GH",
                self.expense_factor
            );
        }
        if self.exchange_rate < 0.0 {
            anyhow::bail!(
                "exchange rate must be positive, or 0 to fetch it (got {})",
                self.exchange_rate
            );
        }
        if self.rpc_url.is_empty() {
            anyhow::bail!("RPC URL must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.pps_rate, 80.0);
        assert_eq!(settings.ghps, 10.0);
        assert_eq!(settings.expense_factor, 4.17e-7);
        assert_eq!(settings.exchange_rate, 0.0);
        assert!(settings.period.is_none());
        assert_eq!(settings.rpc_url, "http://127.0.0.1:8332");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_serialization_round_trip() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings.pps_rate, back.pps_rate);
        assert_eq!(settings.expense_factor, back.expense_factor);
        assert_eq!(settings.rpc_url, back.rpc_url);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ghps": 2350, "exchange_rate": 135.42, "period": 130}}"#).unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.ghps, 2350.0);
        assert_eq!(settings.exchange_rate, 135.42);
        assert_eq!(settings.period, Some(130));
        // Untouched knobs keep their defaults.
        assert_eq!(settings.pps_rate, 80.0);
        assert_eq!(settings.expense_factor, 4.17e-7);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Settings::from_file("/nonexistent/settings.json").is_err());
    }

    #[test]
    fn test_validation_rejections() {
        let mut settings = Settings::default();
        settings.pps_rate = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.ghps = -10.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.expense_factor = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.exchange_rate = -1.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.rpc_url = String::new();
        assert!(settings.validate().is_err());
    }
}
