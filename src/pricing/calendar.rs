// src/pricing/calendar.rs
//! Contract expiration and business-day arithmetic.
//!
//! Business days are Monday through Friday. There is no holiday calendar.
use chrono::{Datelike, Duration, NaiveDate, Weekday};

#[inline]
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// First business day of the month following `reference`.
/// December rolls into January of the next year.
pub fn contract_expiration(reference: NaiveDate) -> NaiveDate {
    let (year, month) = if reference.month() == 12 {
        (reference.year() + 1, 1)
    } else {
        (reference.year(), reference.month() + 1)
    };
    // Day 1 of a month in 1..=12 always exists.
    let mut day = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(reference);
    while !is_business_day(day) {
        day += Duration::days(1);
    }
    day
}

/// Business days in the closed interval `[today, expiration]`.
/// Returns 0 when `expiration` precedes `today`.
pub fn business_days_inclusive(today: NaiveDate, expiration: NaiveDate) -> u32 {
    today
        .iter_days()
        .take_while(|d| *d <= expiration)
        .filter(|d| is_business_day(*d))
        .count() as u32
}

/// Expiration for `today` and the inclusive business-day count up to it.
pub fn expiration_schedule(today: NaiveDate) -> (NaiveDate, u32) {
    let expiration = contract_expiration(today);
    (expiration, business_days_inclusive(today, expiration))
}
