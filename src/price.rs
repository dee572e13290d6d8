//! BTC/USD exchange rate from the bitcoincharts weighted-prices feed.
//!
//! The feed reports weighted average prices over three trailing windows
//! (30 days, 7 days, 24 hours); the rate used for expense conversion is
//! their geometric mean.

use anyhow::{bail, Context, Result};
use log::info;
use serde::Deserialize;
use std::time::Duration;

pub const WEIGHTED_PRICES_URL: &str = "http://api.bitcoincharts.com/v1/weighted_prices.json";

const FEED_TIMEOUT: Duration = Duration::from_secs(30);

// The feed serializes every number as a JSON string, so the wire model
// keeps String fields until they are parsed and range-checked.
#[derive(Debug, Deserialize)]
struct WeightedPricesDoc {
    #[serde(rename = "USD")]
    usd: UsdWindows,
}

#[derive(Debug, Deserialize)]
struct UsdWindows {
    #[serde(rename = "30d")]
    d30: String,
    #[serde(rename = "7d")]
    d7: String,
    #[serde(rename = "24h")]
    h24: String,
}

/// USD/BTC weighted averages over the three trailing windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    pub usd_30d: f64,
    pub usd_7d: f64,
    pub usd_24h: f64,
}

impl PriceQuote {
    /// The single scalar rate derived from the three windows.
    pub fn exchange_rate(&self) -> f64 {
        geometric_mean(self.usd_30d, self.usd_7d, self.usd_24h)
    }
}

/// Geometric mean of three positive reals: `(a * b * c)^(1/3)`.
pub fn geometric_mean(a: f64, b: f64, c: f64) -> f64 {
    (a * b * c).powf(1.0 / 3.0)
}

/// Fetch the weighted-prices document and extract the USD windows.
pub fn fetch_weighted_prices(url: &str) -> Result<PriceQuote> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("franchise-calc/", env!("CARGO_PKG_VERSION")))
        .timeout(FEED_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("price feed request to {} failed", url))?;
    if !response.status().is_success() {
        bail!("price feed error: HTTP {}", response.status());
    }

    let doc: WeightedPricesDoc = response
        .json()
        .context("price feed returned malformed JSON")?;
    let quote = quote_from_doc(doc)?;
    info!(
        "weighted USD prices: 30d={:.2} 7d={:.2} 24h={:.2}",
        quote.usd_30d, quote.usd_7d, quote.usd_24h
    );
    Ok(quote)
}

fn quote_from_doc(doc: WeightedPricesDoc) -> Result<PriceQuote> {
    Ok(PriceQuote {
        usd_30d: parse_rate("30d", &doc.usd.d30)?,
        usd_7d: parse_rate("7d", &doc.usd.d7)?,
        usd_24h: parse_rate("24h", &doc.usd.h24)?,
    })
}

fn parse_rate(window: &str, raw: &str) -> Result<f64> {
    let rate: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("weighted price {} is not numeric: {:?}", window, raw))?;
    if rate <= 0.0 {
        bail!("weighted price {} must be positive, got {}", window, rate);
    }
    Ok(rate)
}
