// src/inputs.rs
//! Input resolution: collaborator results flattened into a [`MarketSnapshot`]
//! plus the list of inputs that could not be resolved.
use chrono::NaiveDate;
use serde::Serialize;

use crate::pricing::calendar;
use crate::pricing::InputUnavailable;
use crate::providers::market::last_close_variation_pct;
use crate::types::{FixingSlots, MarketSnapshot, OhlcQuote, RateFixing, SheetQuotes};

/// Raw outcome of one round of collaborator calls.
#[derive(Debug, Clone)]
pub struct Collected {
    pub sheet: Result<SheetQuotes, InputUnavailable>,
    pub vol_support: Result<f64, InputUnavailable>,
    pub gold_spot: Result<OhlcQuote, InputUnavailable>,
    pub gold_local: Result<f64, InputUnavailable>,
    pub index_bars: Result<Vec<OhlcQuote>, InputUnavailable>,
    pub fixings: Result<Vec<RateFixing>, InputUnavailable>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedInputs {
    pub today: NaiveDate,
    pub expiration: NaiveDate,
    pub snapshot: MarketSnapshot,
    pub vol_support: Option<f64>,
    pub fixings: FixingSlots,
    /// Sheet values as loaded, for display.
    pub sheet: Option<SheetQuotes>,
    pub diagnostics: Vec<InputUnavailable>,
}

fn keep<T>(r: Result<T, InputUnavailable>, diagnostics: &mut Vec<InputUnavailable>) -> Option<T> {
    r.map_err(|e| diagnostics.push(e)).ok()
}

fn field(v: Option<f64>, name: &'static str, diagnostics: &mut Vec<InputUnavailable>) -> Option<f64> {
    let v = v.filter(|x| x.is_finite());
    if v.is_none() {
        diagnostics.push(InputUnavailable::missing(name));
    }
    v
}

pub fn resolve(today: NaiveDate, collected: Collected) -> ResolvedInputs {
    let mut diagnostics = Vec::new();
    let (expiration, business_days) = calendar::expiration_schedule(today);

    let sheet = keep(collected.sheet, &mut diagnostics);
    let (contract_prior_close, spot_rate, rate_future_level) = match &sheet {
        Some(q) => (
            field(q.contract_prior_close, "contract_prior_close", &mut diagnostics),
            field(q.spot_rate, "spot_rate", &mut diagnostics),
            field(q.rate_future_level, "rate_future_level", &mut diagnostics),
        ),
        None => (None, None, None),
    };

    let vol_support = keep(collected.vol_support, &mut diagnostics).filter(|v| v.is_finite());
    let gold_spot_usd = keep(collected.gold_spot, &mut diagnostics)
        .map(|q| q.close)
        .filter(|v| v.is_finite());
    let gold_local_price_per_gram =
        keep(collected.gold_local, &mut diagnostics).filter(|v| v.is_finite());
    let index_variation_pct = keep(collected.index_bars, &mut diagnostics).and_then(|bars| {
        last_close_variation_pct(&bars)
            .map_err(|e| diagnostics.push(e.into_unavailable("index_variation_pct")))
            .ok()
    });

    let fixings = keep(collected.fixings, &mut diagnostics)
        .map(fixing_slots)
        .unwrap_or_default();

    ResolvedInputs {
        today,
        expiration,
        snapshot: MarketSnapshot {
            contract_prior_close,
            spot_rate,
            rate_future_level,
            business_days_to_expiration: Some(business_days),
            gold_spot_usd,
            gold_local_price_per_gram,
            index_variation_pct,
        },
        vol_support,
        fixings,
        sheet,
        diagnostics,
    }
}

/// Chronological order, first four kept. Ties keep arrival order.
pub fn fixing_slots(mut fixings: Vec<RateFixing>) -> FixingSlots {
    fixings.retain(|f| f.value.is_finite());
    fixings.sort_by_key(|f| f.timestamp);
    FixingSlots::from_ordered(fixings)
}
