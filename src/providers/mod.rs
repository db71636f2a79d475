// src/providers/mod.rs
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::DashboardConfig;
use crate::pricing::InputUnavailable;
use crate::types::{OhlcQuote, RateFixing, SheetQuotes};

pub mod gold;
pub mod market;
pub mod ptax;
pub mod sheet;

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("reader task: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("parse: {0}")]
    Parse(String),
    #[error("no data: {0}")]
    NoData(String),
}

impl ProviderError {
    pub fn into_unavailable(self, input: &'static str) -> InputUnavailable {
        InputUnavailable::new(input, self.to_string())
    }
}

/// The trading workbook: quotes and the support cell.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn quotes(&self) -> Result<SheetQuotes, ProviderError>;
    /// The statistical support value added into the displacement.
    async fn vol_support(&self) -> Result<f64, ProviderError>;
}

/// Daily bars for exchange tickers.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars with a close, oldest first.
    async fn daily_bars(&self, ticker: &str) -> Result<Vec<OhlcQuote>, ProviderError>;

    async fn latest(&self, ticker: &str) -> Result<OhlcQuote, ProviderError> {
        self.daily_bars(ticker)
            .await?
            .last()
            .copied()
            .ok_or_else(|| ProviderError::NoData(ticker.to_string()))
    }
}

#[async_trait]
pub trait GoldPriceProvider: Send + Sync {
    /// Local gold price per gram.
    async fn price_per_gram(&self) -> Result<f64, ProviderError>;
}

#[async_trait]
pub trait FixingProvider: Send + Sync {
    /// Fixings of the most recent session on or before `day`, chronological.
    async fn fixings(&self, day: NaiveDate) -> Result<Vec<RateFixing>, ProviderError>;
}

/// Shared HTTP client honoring the configured timeout and user agent.
pub fn http_client(cfg: &DashboardConfig) -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder()
        .timeout(cfg.http_timeout())
        .user_agent(cfg.user_agent.clone())
        .build()?)
}

/// Accepts `5421.5`, `5421,5` and `5.421,50`.
pub fn parse_number(raw: &str) -> Result<f64, ProviderError> {
    let s = raw.trim();
    let normalized = match (s.contains(','), s.contains('.')) {
        (true, true) => s.replace('.', "").replace(',', "."),
        (true, false) => s.replace(',', "."),
        _ => s.to_string(),
    };
    let v: f64 = normalized
        .parse()
        .map_err(|_| ProviderError::Parse(format!("not a number: {raw:?}")))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ProviderError::Parse(format!("not finite: {raw:?}")))
    }
}
