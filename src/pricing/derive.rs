// src/pricing/derive.rs
//! Scalar derivations. Each takes optional inputs and yields `None` unless
//! every input is present and finite. Rounding happens only on the way out.
use rust_decimal::{Decimal, RoundingStrategy};

/// Grams per troy ounce.
pub const GRAMS_PER_TROY_OUNCE: f64 = 31.1035;
/// Trading days per year used to de-annualize the rate future.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Rounds the exact binary value of `x` to `dp` decimal places, ties to even.
/// Values outside the decimal range come back unchanged.
pub fn round_dp(x: f64, dp: u32) -> f64 {
    let Some(exact) = Decimal::from_f64_retain(x) else {
        return x;
    };
    exact
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven)
        .to_string()
        .parse()
        .unwrap_or(x)
}

#[inline]
pub(crate) fn finite(x: Option<f64>) -> Option<f64> {
    x.filter(|v| v.is_finite())
}

/// Implied local-currency rate per 1000 units from the gold cross.
pub fn gold_parity(gold_spot_usd: Option<f64>, local_price_per_gram: Option<f64>) -> Option<f64> {
    let spot = finite(gold_spot_usd)?;
    let local = finite(local_price_per_gram)?;
    if spot == 0.0 {
        return None;
    }
    let spot_per_gram = spot / GRAMS_PER_TROY_OUNCE;
    Some(round_dp((local / spot_per_gram) * 1000.0, 4))
}

/// Prior close moved by the index variation (percent).
pub fn estimated_opening(prior_close: Option<f64>, index_variation_pct: Option<f64>) -> Option<f64> {
    let close = finite(prior_close)?;
    let variation = finite(index_variation_pct)?;
    Some(round_dp(close * (1.0 + variation / 100.0), 4))
}

/// "Over": the rate future (decimal fraction) de-annualized on a 252-day
/// basis and scaled by the remaining business days.
pub fn carry_rate(rate_future_level: Option<f64>, business_days: Option<u32>) -> Option<f64> {
    let rate = finite(rate_future_level)?;
    let days = business_days?;
    let daily = (1.0 + rate).powf(1.0 / TRADING_DAYS_PER_YEAR) - 1.0;
    finite(Some(round_dp(daily * f64::from(days), 5)))
}

/// Spot carried forward; the carry is read as a percent here.
pub fn fair_value(spot_rate: Option<f64>, carry: Option<f64>) -> Option<f64> {
    let spot = finite(spot_rate)?;
    let carry = finite(carry)?;
    Some(round_dp(spot * (1.0 + carry / 100.0), 4))
}

/// `round(1 / quote * 1000, 2)`, the quote expressed in contract points.
pub fn implied_points(quote: f64) -> Option<f64> {
    if !quote.is_finite() || quote == 0.0 {
        return None;
    }
    Some(round_dp(1.0 / quote * 1000.0, 2))
}
