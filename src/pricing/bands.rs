// src/pricing/bands.rs
use super::derive::{finite, round_dp};
use crate::types::{Displacement, FixingBands, FixingSlots, FixingSummary, PriceBand, FIXING_SLOTS};

/// Secondary band widening over the primary band.
pub const SECOND_TIER_UP: f64 = 1.005;
pub const SECOND_TIER_DOWN: f64 = 0.995;
/// Fixings are quoted per unit; bands are in points (x1000).
pub const FIXING_POINTS_MULTIPLIER: f64 = 1000.0;

/// Unrounded displacement shared by every band:
/// `opening * carry / 100 + vol_support`.
pub fn displacement(
    estimated_opening: Option<f64>,
    carry: Option<f64>,
    vol_support: Option<f64>,
) -> Option<f64> {
    let opening = finite(estimated_opening)?;
    let carry = finite(carry)?;
    let support = finite(vol_support)?;
    finite(Some(opening * (carry / 100.0) + support))
}

/// Displacement as reported: value at 5 decimals, points at 4.
pub fn report_displacement(raw: f64) -> Displacement {
    Displacement {
        value: round_dp(raw, 5),
        points: round_dp(raw * 1000.0, 4),
    }
}

/// Bands around `anchor`; the secondary tier widens the unrounded primary.
pub fn price_band(anchor: f64, displacement: f64) -> PriceBand {
    let first_max = anchor + displacement;
    let first_min = anchor - displacement;
    PriceBand {
        first_max: round_dp(first_max, 2),
        first_min: round_dp(first_min, 2),
        second_max: round_dp(first_max * SECOND_TIER_UP, 2),
        second_min: round_dp(first_min * SECOND_TIER_DOWN, 2),
    }
}

/// Band anchored on the estimated opening.
pub fn opening_band(
    estimated_opening: Option<f64>,
    carry: Option<f64>,
    vol_support: Option<f64>,
) -> Option<PriceBand> {
    let d = displacement(estimated_opening, carry, vol_support)?;
    Some(price_band(estimated_opening?, d))
}

/// One band per present fixing, each independent of the others.
pub fn fixing_bands(displacement: Option<f64>, fixings: &FixingSlots) -> FixingBands {
    let mut out = [None; FIXING_SLOTS];
    if let Some(d) = finite(displacement) {
        for (band, fixing) in out.iter_mut().zip(fixings.0.iter()) {
            *band = fixing
                .as_ref()
                .filter(|f| f.value.is_finite())
                .map(|f| price_band(f.value * FIXING_POINTS_MULTIPLIER, d));
        }
    }
    FixingBands(out)
}

/// Mean primary max/min over the present fixing bands, once at least two exist.
pub fn fixing_summary(bands: &FixingBands) -> Option<FixingSummary> {
    let present: Vec<&PriceBand> = bands.0.iter().flatten().collect();
    if present.len() < 2 {
        return None;
    }
    let n = present.len() as f64;
    let mean_max = present.iter().map(|b| b.first_max).sum::<f64>() / n;
    let mean_min = present.iter().map(|b| b.first_min).sum::<f64>() / n;
    Some(FixingSummary {
        mean_first_max: round_dp(mean_max, 2),
        mean_first_min: round_dp(mean_min, 2),
        amplitude: round_dp(mean_max - mean_min, 2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RateFixing;
    use chrono::NaiveDate;

    const EPS: f64 = 1e-9;

    fn fixing(value: f64, hour: u32) -> RateFixing {
        RateFixing {
            value,
            timestamp: NaiveDate::from_ymd_opt(2026, 10, 19)
                .unwrap()
                .and_hms_opt(hour, 4, 30)
                .unwrap(),
        }
    }

    #[test]
    fn displacement_requires_all_inputs() {
        assert!(displacement(Some(5421.6), Some(0.0045), Some(12.5)).is_some());
        assert_eq!(displacement(None, Some(0.0045), Some(12.5)), None);
        assert_eq!(displacement(Some(5421.6), None, Some(12.5)), None);
        assert_eq!(displacement(Some(5421.6), Some(0.0045), None), None);
    }

    #[test]
    fn displacement_report_precision() {
        let d = displacement(Some(5421.6), Some(0.0045), Some(12.5)).unwrap();
        let r = report_displacement(d);
        assert!((r.value - 12.74397).abs() < EPS);
        assert!((r.points - 12743.972).abs() < 1e-6);
    }

    #[test]
    fn opening_band_is_symmetric() {
        let opening = 5421.6;
        let band = price_band(opening, 25.25);
        assert!((band.first_max - opening - 25.25).abs() < EPS);
        assert!((opening - band.first_min - 25.25).abs() < EPS);
    }

    #[test]
    fn opening_band_known_values() {
        let band = opening_band(Some(5421.6), Some(0.0045), Some(12.5)).unwrap();
        assert_eq!(band.first_max, 5434.34);
        assert_eq!(band.first_min, 5408.86);
        assert_eq!(band.second_max, 5461.52);
        assert_eq!(band.second_min, 5381.81);
    }

    #[test]
    fn opening_band_absent_without_support() {
        assert_eq!(opening_band(Some(5421.6), Some(0.0045), None), None);
        assert_eq!(opening_band(None, Some(0.0045), Some(12.5)), None);
    }

    #[test]
    fn second_tier_widens_first_tier() {
        for (anchor, d) in [(5421.6, 12.74), (5300.0, 31.4159), (4999.99, 0.5)] {
            let b = price_band(anchor, d);
            assert_eq!(b.second_max, round_dp((anchor + d) * SECOND_TIER_UP, 2));
            assert_eq!(b.second_min, round_dp((anchor - d) * SECOND_TIER_DOWN, 2));
            assert!(b.second_max > b.first_max);
            assert!(b.second_min < b.first_min);
        }
    }

    #[test]
    fn fixing_bands_are_positional() {
        let slots = FixingSlots([None, None, Some(fixing(5.4321, 13)), None]);
        let bands = fixing_bands(Some(12.743972), &slots);
        assert_eq!(bands.count(), 1);
        assert!(bands.get(0).is_none());
        let third = bands.get(2).unwrap();
        assert_eq!(third.first_max, 5444.84);
        assert_eq!(third.first_min, 5419.36);
        assert_eq!(third.second_max, 5472.07);
        assert_eq!(third.second_min, 5392.26);
    }

    #[test]
    fn two_of_four_fixings_give_two_bands() {
        let slots = FixingSlots::from_ordered([fixing(5.4321, 10), fixing(5.4410, 11)]);
        let bands = fixing_bands(Some(12.743972), &slots);
        assert_eq!(bands.count(), 2);
        assert!(bands.get(2).is_none() && bands.get(3).is_none());
        assert_eq!(bands.get(1).unwrap().first_max, 5453.74);
    }

    #[test]
    fn fixing_bands_absent_without_displacement() {
        let slots = FixingSlots::from_ordered([fixing(5.4321, 10)]);
        assert_eq!(fixing_bands(None, &slots).count(), 0);
    }

    #[test]
    fn summary_needs_two_bands() {
        let one = FixingBands([Some(price_band(5400.0, 10.0)), None, None, None]);
        assert_eq!(fixing_summary(&one), None);

        let two = FixingBands([
            Some(price_band(5400.0, 10.0)),
            None,
            Some(price_band(5420.0, 10.0)),
            None,
        ]);
        let s = fixing_summary(&two).unwrap();
        assert_eq!(s.mean_first_max, 5420.0);
        assert_eq!(s.mean_first_min, 5400.0);
        assert_eq!(s.amplitude, 20.0);
    }
}
