// src/pricing/mod.rs
use serde::Serialize;

use crate::types::{
    DerivedMetrics, Displacement, FixingBands, FixingSlots, FixingSummary, MarketSnapshot,
    PriceBand,
};

pub mod bands;
pub mod calendar;
pub mod derive;

/// A required upstream quantity could not be resolved. Collaborators return
/// it; the pipeline itself only ever sees the resulting `None`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{input} unavailable: {reason}")]
pub struct InputUnavailable {
    pub input: &'static str,
    pub reason: String,
}

impl InputUnavailable {
    pub fn new(input: &'static str, reason: impl Into<String>) -> Self {
        Self { input, reason: reason.into() }
    }

    pub fn missing(input: &'static str) -> Self {
        Self::new(input, "no value")
    }
}

/// Everything the pipeline derives from one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PipelineOutput {
    pub metrics: DerivedMetrics,
    pub displacement: Option<Displacement>,
    pub opening_band: Option<PriceBand>,
    pub fixing_bands: FixingBands,
    pub fixing_summary: Option<FixingSummary>,
}

/// Runs the derivations in dependency order. Pure; holds no state.
pub fn run(
    snapshot: &MarketSnapshot,
    vol_support: Option<f64>,
    fixings: &FixingSlots,
) -> PipelineOutput {
    let gold_parity =
        derive::gold_parity(snapshot.gold_spot_usd, snapshot.gold_local_price_per_gram);
    let estimated_opening =
        derive::estimated_opening(snapshot.contract_prior_close, snapshot.index_variation_pct);
    let carry_rate =
        derive::carry_rate(snapshot.rate_future_level, snapshot.business_days_to_expiration);
    let fair_value = derive::fair_value(snapshot.spot_rate, carry_rate);

    let raw_displacement = bands::displacement(estimated_opening, carry_rate, vol_support);
    let opening_band = bands::opening_band(estimated_opening, carry_rate, vol_support);
    let fixing_bands = bands::fixing_bands(raw_displacement, fixings);

    PipelineOutput {
        metrics: DerivedMetrics { gold_parity, estimated_opening, carry_rate, fair_value },
        displacement: raw_displacement.map(bands::report_displacement),
        opening_band,
        fixing_summary: bands::fixing_summary(&fixing_bands),
        fixing_bands,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RateFixing;
    use chrono::NaiveDate;

    fn full_snapshot() -> MarketSnapshot {
        MarketSnapshot {
            contract_prior_close: Some(5400.0),
            spot_rate: Some(5.4),
            rate_future_level: Some(0.12),
            business_days_to_expiration: Some(10),
            gold_spot_usd: Some(2000.0),
            gold_local_price_per_gram: Some(643.22),
            index_variation_pct: Some(0.40),
        }
    }

    fn fixings() -> FixingSlots {
        let ts = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap().and_hms_opt(10, 4, 0).unwrap();
        FixingSlots::from_ordered([
            RateFixing { value: 5.4321, timestamp: ts },
            RateFixing { value: 5.4410, timestamp: ts + chrono::Duration::hours(1) },
        ])
    }

    #[test]
    fn full_inputs_produce_everything() {
        let out = run(&full_snapshot(), Some(12.5), &fixings());
        assert_eq!(out.metrics.carry_rate, Some(0.0045));
        assert!(out.metrics.gold_parity.is_some());
        assert!(out.metrics.fair_value.is_some());
        assert_eq!(out.opening_band.unwrap().first_max, 5434.34);
        assert_eq!(out.fixing_bands.count(), 2);
        assert!(out.fixing_summary.is_some());
        assert_eq!(out.displacement.unwrap().value, 12.74397);
    }

    #[test]
    fn opening_band_matches_band_builder() {
        let out = run(&full_snapshot(), Some(12.5), &fixings());
        let m = out.metrics;
        assert_eq!(
            out.opening_band,
            bands::opening_band(m.estimated_opening, m.carry_rate, Some(12.5))
        );
        assert_eq!(out.opening_band.unwrap().second_min, 5381.81);
    }

    #[test]
    fn missing_rate_future_voids_carry_and_everything_downstream() {
        let snap = MarketSnapshot { rate_future_level: None, ..full_snapshot() };
        let out = run(&snap, Some(12.5), &fixings());
        assert_eq!(out.metrics.carry_rate, None);
        assert_eq!(out.metrics.fair_value, None);
        assert_eq!(out.displacement, None);
        assert_eq!(out.opening_band, None);
        assert_eq!(out.fixing_bands.count(), 0);
        assert_eq!(out.fixing_summary, None);
        // Independent branches survive.
        assert!(out.metrics.gold_parity.is_some());
        assert!(out.metrics.estimated_opening.is_some());
    }

    #[test]
    fn missing_support_voids_only_bands() {
        let out = run(&full_snapshot(), None, &fixings());
        assert!(out.metrics.fair_value.is_some());
        assert_eq!(out.displacement, None);
        assert_eq!(out.opening_band, None);
        assert_eq!(out.fixing_bands.count(), 0);
    }

    #[test]
    fn empty_snapshot_yields_nothing() {
        let out = run(&MarketSnapshot::default(), None, &FixingSlots::default());
        assert_eq!(out, PipelineOutput::default());
    }

    #[test]
    fn input_unavailable_message() {
        let e = InputUnavailable::new("gold_spot_usd", "http 503");
        assert_eq!(e.to_string(), "gold_spot_usd unavailable: http 503");
    }
}
