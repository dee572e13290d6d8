//! Difficulty-period payment arithmetic.
//!
//! Everything here is pure: the calculator is built from already-fetched
//! chain data and an already-resolved exchange rate, so every formula can
//! be exercised without a node or a price feed.

use serde::Serialize;
use thiserror::Error;

use crate::chain::Block;

// ---------------------------------------------------------------------------
// Protocol constants
// ---------------------------------------------------------------------------

/// Blocks per difficulty-adjustment period.
pub const BLOCKS_PER_PERIOD: i64 = 2016;

/// Block subsidy in BTC.
pub const BLOCK_REWARD: f64 = 25.0;

/// Expected hashes to solve a block at difficulty 1 (2^32).
pub const DIFF1: f64 = 4_294_967_296.0;

/// Hashes per second in one GH/s.
pub const GHPS: f64 = 1e9;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CalcError {
    #[error("block {height} carries non-positive difficulty {difficulty}")]
    NonPositiveDifficulty { height: u64, difficulty: f64 },

    #[error("exchange rate must be positive, got {0} USD/BTC")]
    NonPositiveExchangeRate(f64),

    #[error("expense factor must be positive, got {0} USD/sec/GH")]
    NonPositiveExpenseFactor(f64),
}

// ---------------------------------------------------------------------------
// Period resolution
// ---------------------------------------------------------------------------

/// Resolve which difficulty period to evaluate.
///
/// `None` selects the last fully completed period: `tip_height / 2016 - 1`,
/// whose closing block is guaranteed to exist on chain. Explicit indices are
/// used as given, including negative or above-tip values; the block-fetch
/// step is responsible for clamping.
pub fn resolve_period(period: Option<i64>, tip_height: u64) -> i64 {
    match period {
        Some(n) => n,
        None => tip_height as i64 / BLOCKS_PER_PERIOD - 1,
    }
}

/// Block heights bounding period `n`: its first block and the first block of
/// the following period.
pub fn period_bounds(period: i64) -> (i64, i64) {
    let start = period * BLOCKS_PER_PERIOD;
    (start, start + BLOCKS_PER_PERIOD)
}

/// BTC earned per second per GH/s at the given network difficulty,
/// at 100% PPS.
pub fn income_rate_per_second(difficulty: f64) -> f64 {
    GHPS * BLOCK_REWARD / (DIFF1 * difficulty)
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

/// Inputs the payment formula needs beyond the boundary blocks.
#[derive(Debug, Clone, Copy)]
pub struct PaymentParams {
    /// PPS rate in percent.
    pub pps_rate: f64,
    /// Contracted capacity in GH/s.
    pub ghps: f64,
    /// Electricity expenses in USD per second per GH/s.
    pub expense_factor: f64,
    /// Resolved BTC/USD exchange rate.
    pub exchange_rate: f64,
}

/// All figures for one evaluated period. Per-GH amounts are at 100% PPS
/// unless the field name says otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodReport {
    pub period: i64,
    pub start_height: i64,
    pub end_height: i64,
    pub difficulty: f64,
    pub duration_secs: i64,
    pub start_time: i64,
    pub end_time: i64,
    pub gross_income_btc: f64,
    pub expense_factor: f64,
    pub expenses_usd: f64,
    pub exchange_rate: f64,
    pub expenses_btc: f64,
    pub net_income_btc: f64,
    pub pps_rate: f64,
    pub ghps: f64,
    pub payment_per_gh_btc: f64,
    pub payment_total_btc: f64,
}

pub struct PaymentCalculator {
    params: PaymentParams,
}

impl PaymentCalculator {
    /// Build a calculator, rejecting parameters that would divide by zero
    /// or produce meaningless output downstream.
    pub fn new(params: PaymentParams) -> Result<Self, CalcError> {
        if params.exchange_rate <= 0.0 {
            return Err(CalcError::NonPositiveExchangeRate(params.exchange_rate));
        }
        if params.expense_factor <= 0.0 {
            return Err(CalcError::NonPositiveExpenseFactor(params.expense_factor));
        }
        Ok(Self { params })
    }

    /// Run the payment formula over one period's boundary blocks.
    ///
    /// Net income may be negative when expenses exceed mining income; that
    /// is a valid, reportable outcome. A duration of zero (both boundaries
    /// clamped to the chain tip) yields an all-zero report.
    pub fn compute_payment(
        &self,
        period: i64,
        block0: &Block,
        block1: &Block,
    ) -> Result<PeriodReport, CalcError> {
        let difficulty = block0.difficulty;
        if difficulty <= 0.0 {
            return Err(CalcError::NonPositiveDifficulty {
                height: block0.height,
                difficulty,
            });
        }

        let (start_height, end_height) = period_bounds(period);
        let duration_secs = block1.time - block0.time;
        let duration = duration_secs as f64;

        let gross_income_btc = income_rate_per_second(difficulty) * duration;
        let expenses_usd = duration * self.params.expense_factor;
        let expenses_btc = expenses_usd / self.params.exchange_rate;
        let net_income_btc = gross_income_btc - expenses_btc;

        let franchise_share = self.params.pps_rate / 100.0;
        let payment_per_gh_btc = franchise_share * net_income_btc;
        let payment_total_btc = payment_per_gh_btc * self.params.ghps;

        Ok(PeriodReport {
            period,
            start_height,
            end_height,
            difficulty,
            duration_secs,
            start_time: block0.time,
            end_time: block1.time,
            gross_income_btc,
            expense_factor: self.params.expense_factor,
            expenses_usd,
            exchange_rate: self.params.exchange_rate,
            expenses_btc,
            net_income_btc,
            pps_rate: self.params.pps_rate,
            ghps: self.params.ghps,
            payment_per_gh_btc,
            payment_total_btc,
        })
    }
}
