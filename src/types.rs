// src/types.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Number of reference-rate fixings published per session.
pub const FIXING_SLOTS: usize = 4;

/// Flat record of the scalar quantities the pricing pipeline consumes.
/// Every field is optional; `None` means the input could not be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub contract_prior_close: Option<f64>,
    pub spot_rate: Option<f64>,
    pub rate_future_level: Option<f64>, // decimal fraction, 0.12 = 12%
    pub business_days_to_expiration: Option<u32>,
    pub gold_spot_usd: Option<f64>,            // per troy ounce
    pub gold_local_price_per_gram: Option<f64>,
    pub index_variation_pct: Option<f64>,      // already in percent, 0.35 = 0.35%
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateFixing {
    pub value: f64,
    pub timestamp: NaiveDateTime,
}

impl RateFixing {
    pub fn date_label(&self) -> String {
        self.timestamp.format("%d/%m/%Y").to_string()
    }

    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

/// The day's fixings in arrival order, padded/truncated to exactly four slots.
/// Slot `i` is always the `i`-th chronological fixing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FixingSlots(pub [Option<RateFixing>; FIXING_SLOTS]);

impl FixingSlots {
    /// Fixings must already be in chronological order; extras past the fourth are dropped.
    pub fn from_ordered<I: IntoIterator<Item = RateFixing>>(fixings: I) -> Self {
        let mut slots = [None; FIXING_SLOTS];
        for (slot, fixing) in slots.iter_mut().zip(fixings) {
            *slot = Some(fixing);
        }
        Self(slots)
    }

    pub fn get(&self, position: usize) -> Option<&RateFixing> {
        self.0.get(position).and_then(Option::as_ref)
    }

    pub fn available(&self) -> usize {
        self.0.iter().filter(|f| f.is_some()).count()
    }

    /// `(1-based position, fixing)` for every occupied slot.
    pub fn iter_present(&self) -> impl Iterator<Item = (usize, &RateFixing)> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.as_ref().map(|f| (i + 1, f)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub gold_parity: Option<f64>,
    pub estimated_opening: Option<f64>,
    pub carry_rate: Option<f64>, // "over"
    pub fair_value: Option<f64>,
}

/// Primary and secondary band around an anchor. Produced whole or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub first_max: f64,
    pub first_min: f64,
    pub second_max: f64,
    pub second_min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Displacement {
    pub value: f64,  // 5 decimals
    pub points: f64, // value * 1000, 4 decimals
}

/// One band per fixing slot; `None` where the fixing is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FixingBands(pub [Option<PriceBand>; FIXING_SLOTS]);

impl FixingBands {
    pub fn get(&self, position: usize) -> Option<&PriceBand> {
        self.0.get(position).and_then(Option::as_ref)
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|b| b.is_some()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixingSummary {
    pub mean_first_max: f64,
    pub mean_first_min: f64,
    pub amplitude: f64,
}

// ---- collaborator shapes ----

/// Values lifted from the quotes sheet. Missing asset rows stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetQuotes {
    pub contract_prior_close: Option<f64>, // WDOFUT, prior close
    pub spot_rate: Option<f64>,            // USD/BRL, prior close
    pub rate_future_level: Option<f64>,    // DI1FUT, last
    pub forward_points: Option<f64>,       // FRP0, last
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcQuote {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteRow {
    pub metric: &'static str,
    pub quote: f64,
    pub implied: Option<f64>, // 1/quote * 1000, 2 decimals
}

/// OHLC of a ticker next to its implied points value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteTable {
    pub name: String,
    pub ticker: String,
    pub rows: Vec<QuoteRow>,
}
