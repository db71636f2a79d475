// src/providers/market.rs
use backon::{ExponentialBuilder, Retryable};
use serde::Deserialize;

use super::{MarketDataProvider, ProviderError};
use crate::config::DashboardConfig;
use crate::types::OhlcQuote;

/// Yahoo Finance v8 chart endpoint, 5 daily bars.
pub struct YahooChart {
    pub http: reqwest::Client,
    pub base_url: String,
    pub retries: usize,
}

impl YahooChart {
    pub fn from_config(cfg: &DashboardConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: cfg.market_data_url.trim_end_matches('/').to_string(),
            retries: cfg.http_retries,
        }
    }

    async fn fetch(&self, ticker: &str) -> Result<ChartResponse, ProviderError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let resp = self
            .http
            .get(&url)
            .query(&[("range", "5d"), ("interval", "1d")])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<ChartResponse>().await?)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl QuoteSeries {
    /// Bars with a close; missing open/high/low fall back to the close.
    fn bars(&self) -> Vec<OhlcQuote> {
        let at = |v: &[Option<f64>], i: usize| v.get(i).copied().flatten();
        self.close
            .iter()
            .enumerate()
            .filter_map(|(i, c)| {
                let close = c.filter(|x| x.is_finite())?;
                Some(OhlcQuote {
                    open: at(&self.open, i).unwrap_or(close),
                    high: at(&self.high, i).unwrap_or(close),
                    low: at(&self.low, i).unwrap_or(close),
                    close,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooChart {
    async fn daily_bars(&self, ticker: &str) -> Result<Vec<OhlcQuote>, ProviderError> {
        let resp = (move || self.fetch(ticker))
            .retry(ExponentialBuilder::default().with_max_times(self.retries))
            .when(|e| matches!(e, ProviderError::Http(_)))
            .notify(|e, dur| tracing::debug!(%ticker, "market data retry in {dur:?}: {e}"))
            .await?;

        if let Some(err) = resp.chart.error.filter(|e| !e.is_null()) {
            return Err(ProviderError::NoData(format!("{ticker}: {err}")));
        }
        let bars = resp
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
            .and_then(|r| r.indicators.quote.into_iter().next())
            .map(|q| q.bars())
            .unwrap_or_default();
        if bars.is_empty() {
            return Err(ProviderError::NoData(ticker.to_string()));
        }
        Ok(bars)
    }
}

/// Percent change between the last two closes, rounded to 2 decimals.
pub fn last_close_variation_pct(bars: &[OhlcQuote]) -> Result<f64, ProviderError> {
    let [.., prev, last] = bars else {
        return Err(ProviderError::NoData("fewer than two closes".into()));
    };
    if prev.close == 0.0 {
        return Err(ProviderError::Parse("previous close is zero".into()));
    }
    Ok(crate::pricing::derive::round_dp((last.close - prev.close) / prev.close * 100.0, 2))
}
