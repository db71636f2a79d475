// src/refresh.rs
use chrono::{NaiveDate, NaiveDateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::DashboardConfig;
use crate::inputs::{self, Collected, ResolvedInputs};
use crate::pricing::{self, derive::implied_points, PipelineOutput};
use crate::providers::{
    gold::GoldPage, http_client, market::YahooChart, ptax::PtaxFeed, sheet::Workbook,
    FixingProvider, GoldPriceProvider, MarketDataProvider, ProviderError, SheetSource,
};
use crate::publishing::Publisher;
use crate::types::{OhlcQuote, QuoteRow, QuoteTable};

/// Everything one refresh produced, ready for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub generated_at: NaiveDateTime,
    pub inputs: ResolvedInputs,
    pub output: PipelineOutput,
    pub quote_tables: Vec<QuoteTable>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.inputs.diagnostics.is_empty()
    }
}

/// The external data sources one refresh calls.
#[derive(Clone)]
pub struct Collaborators {
    pub sheets: Arc<dyn SheetSource>,
    pub market: Arc<dyn MarketDataProvider>,
    pub gold: Arc<dyn GoldPriceProvider>,
    pub fixings: Arc<dyn FixingProvider>,
}

impl Collaborators {
    pub fn from_config(cfg: &DashboardConfig) -> Result<Self, ProviderError> {
        let http = http_client(cfg)?;
        Ok(Self {
            sheets: Arc::new(Workbook::from_config(cfg, http.clone())?),
            market: Arc::new(YahooChart::from_config(cfg, http.clone())),
            gold: Arc::new(GoldPage::from_config(cfg, http.clone())),
            fixings: Arc::new(PtaxFeed::from_config(cfg, http)),
        })
    }
}

pub struct Dashboard<Pu>
where
    Pu: Publisher + Send + Sync + 'static,
{
    pub cfg: Arc<DashboardConfig>,
    pub publisher: Pu,
    pub sources: Collaborators,
}

impl<Pu> Dashboard<Pu>
where
    Pu: Publisher + Send + Sync + 'static,
{
    pub fn new(cfg: Arc<DashboardConfig>, publisher: Pu, sources: Collaborators) -> Self {
        Self { cfg, publisher, sources }
    }

    /// Refreshes for the current local date and publishes the report.
    pub async fn tick_once(&self) -> anyhow::Result<RefreshReport> {
        let tz = self.cfg.tz()?;
        let now = Utc::now().with_timezone(&tz).naive_local();
        let report = self.refresh(now).await;

        if let Err(e) = self.publisher.publish(&report).await {
            tracing::warn!("publish failed: {e:?}");
        }
        Ok(report)
    }

    /// Refreshes every `interval` until the task is dropped.
    pub async fn run(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.tick_once().await {
                tracing::error!("refresh failed: {e:?}");
            }
        }
    }

    /// One full cycle: collect, resolve, derive. Never fails; unresolved
    /// inputs show up as diagnostics and absent outputs.
    pub async fn refresh(&self, now: NaiveDateTime) -> RefreshReport {
        let today = now.date();
        let (collected, quote_tables) =
            futures::join!(self.collect(today), self.quote_tables());

        let inputs = inputs::resolve(today, collected);
        for d in &inputs.diagnostics {
            tracing::warn!(input = d.input, reason = %d.reason, "input unavailable");
            #[cfg(feature = "metrics")]
            crate::metrics::UNAVAILABLE_TOTAL.with_label_values(&[d.input]).inc();
        }

        let output = pricing::run(&inputs.snapshot, inputs.vol_support, &inputs.fixings);
        tracing::info!(
            %today,
            opening = ?output.metrics.estimated_opening,
            over = ?output.metrics.carry_rate,
            fair_value = ?output.metrics.fair_value,
            fixings = inputs.fixings.available(),
            "refresh complete"
        );

        let report = RefreshReport { generated_at: now, inputs, output, quote_tables };
        #[cfg(feature = "metrics")]
        crate::metrics::REFRESH_TOTAL
            .with_label_values(&[if report.is_complete() { "complete" } else { "partial" }])
            .inc();
        report
    }

    async fn collect(&self, today: NaiveDate) -> Collected {
        #[cfg(feature = "metrics")]
        let _timer = crate::metrics::COLLECT_LATENCY.with_label_values(&["collect"]).start_timer();

        let s = &self.sources;
        let tickers = &self.cfg.tickers;
        let (sheet, vol_support, gold_spot, gold_local, index_bars, fixings) = futures::join!(
            s.sheets.quotes(),
            s.sheets.vol_support(),
            s.market.latest(&tickers.gold),
            s.gold.price_per_gram(),
            s.market.daily_bars(&tickers.dollar_index),
            s.fixings.fixings(today),
        );

        Collected {
            sheet: sheet.map_err(|e| e.into_unavailable("sheet")),
            vol_support: vol_support.map_err(|e| e.into_unavailable("vol_support")),
            gold_spot: gold_spot.map_err(|e| e.into_unavailable("gold_spot_usd")),
            gold_local: gold_local.map_err(|e| e.into_unavailable("gold_local_price_per_gram")),
            index_bars: index_bars.map_err(|e| e.into_unavailable("index_variation_pct")),
            fixings: fixings.map_err(|e| e.into_unavailable("fixings")),
        }
    }

    async fn quote_tables(&self) -> Vec<QuoteTable> {
        #[cfg(feature = "metrics")]
        let _timer =
            crate::metrics::COLLECT_LATENCY.with_label_values(&["quote_tables"]).start_timer();

        let tickers = &self.cfg.tickers;
        let wanted = [("CME - 6L", tickers.contract.as_str()), ("BRL/USD", tickers.brl_usd.as_str())];
        let futs = wanted.iter().map(|(name, ticker)| async move {
            match self.sources.market.latest(ticker).await {
                Ok(q) => Some(quote_table(name, ticker, &q)),
                Err(err) => {
                    tracing::debug!(%ticker, "quote table skipped: {err}");
                    None
                }
            }
        });
        join_all(futs).await.into_iter().flatten().collect()
    }
}

/// OHLC rows with each quote's implied points.
pub fn quote_table(name: &str, ticker: &str, q: &OhlcQuote) -> QuoteTable {
    let rows = [("Open", q.open), ("Close", q.close), ("High", q.high), ("Low", q.low)]
        .into_iter()
        .map(|(metric, quote)| QuoteRow { metric, quote, implied: implied_points(quote) })
        .collect();
    QuoteTable { name: name.to_string(), ticker: ticker.to_string(), rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_table_inverts_each_metric() {
        let q = OhlcQuote { open: 0.18312, high: 0.2, low: 0.0, close: 0.25 };
        let t = quote_table("CME - 6L", "6L=F", &q);
        let metrics: Vec<_> = t.rows.iter().map(|r| r.metric).collect();
        assert_eq!(metrics, ["Open", "Close", "High", "Low"]);
        assert_eq!(t.rows[0].implied, Some(5460.9));
        assert_eq!(t.rows[1].implied, Some(4000.0));
        assert_eq!(t.rows[3].implied, None);
    }
}
