// src/providers/ptax.rs
//! Central bank PTAX bulletins via the Olinda OData service.
use backon::{ExponentialBuilder, Retryable};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use super::{FixingProvider, ProviderError};
use crate::config::DashboardConfig;
use crate::types::RateFixing;

const ENDPOINT: &str =
    "CotacaoMoedaPeriodo(moeda=@moeda,dataInicial=@dataInicial,dataFinalCotacao=@dataFinalCotacao)";

pub struct PtaxFeed {
    pub http: reqwest::Client,
    pub base_url: String,
    pub currency: String,
    /// Calendar days to walk back looking for a session with bulletins.
    pub lookback_days: u32,
    pub retries: usize,
}

impl PtaxFeed {
    pub fn from_config(cfg: &DashboardConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: cfg.ptax_url.trim_end_matches('/').to_string(),
            currency: "USD".into(),
            lookback_days: cfg.ptax_lookback_days,
            retries: cfg.http_retries,
        }
    }

    async fn query_day(&self, day: NaiveDate) -> Result<Vec<Bulletin>, ProviderError> {
        let date = quoted(&day.format("%m-%d-%Y").to_string());
        let url = format!("{}/{}", self.base_url, ENDPOINT);
        let currency = quoted(&self.currency);
        let (http, url, currency, date) = (&self.http, url.as_str(), currency.as_str(), date.as_str());
        let fetch = move || async move {
            let resp = http
                .get(url)
                .query(&[
                    ("@moeda", currency),
                    ("@dataInicial", date),
                    ("@dataFinalCotacao", date),
                    ("$format", "json"),
                ])
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, ProviderError>(resp.json::<ODataPage>().await?)
        };
        let page = fetch
            .retry(ExponentialBuilder::default().with_max_times(self.retries))
            .when(|e| matches!(e, ProviderError::Http(_)))
            .await?;
        Ok(page.value)
    }
}

fn quoted(s: &str) -> String {
    format!("'{s}'")
}

#[derive(Debug, Deserialize)]
struct ODataPage {
    #[serde(default)]
    value: Vec<Bulletin>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Bulletin {
    cotacao_venda: f64,
    data_hora_cotacao: String,
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, ProviderError> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| ProviderError::Parse(format!("dataHoraCotacao {raw:?}: {e}")))
}

/// Sell rates stamped on `day`, oldest first.
fn session_fixings(bulletins: Vec<Bulletin>, day: NaiveDate) -> Result<Vec<RateFixing>, ProviderError> {
    let mut out = Vec::with_capacity(bulletins.len());
    for b in bulletins {
        let timestamp = parse_timestamp(&b.data_hora_cotacao)?;
        if timestamp.date() == day && b.cotacao_venda.is_finite() {
            out.push(RateFixing { value: b.cotacao_venda, timestamp });
        }
    }
    out.sort_by_key(|f| f.timestamp);
    Ok(out)
}

#[async_trait::async_trait]
impl FixingProvider for PtaxFeed {
    async fn fixings(&self, day: NaiveDate) -> Result<Vec<RateFixing>, ProviderError> {
        for back in 0..=self.lookback_days {
            let probe = day - Duration::days(i64::from(back));
            let bulletins = self.query_day(probe).await?;
            if bulletins.is_empty() {
                tracing::debug!(%probe, "no PTAX bulletins, stepping back a day");
                continue;
            }
            return session_fixings(bulletins, probe);
        }
        Err(ProviderError::NoData(format!(
            "no PTAX bulletins within {} days of {day}",
            self.lookback_days
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn feed(server: &MockServer, lookback_days: u32) -> PtaxFeed {
        PtaxFeed {
            http: reqwest::Client::new(),
            base_url: server.base_url(),
            currency: "USD".into(),
            lookback_days,
            retries: 0,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn walks_back_to_last_session_and_sorts() {
        let server = MockServer::start_async().await;
        // Sunday and Saturday: empty.
        for d in ["'10-18-2026'", "'10-17-2026'"] {
            server
                .mock_async(|when, then| {
                    when.method(GET)
                        .path_contains("CotacaoMoedaPeriodo")
                        .query_param("@dataInicial", d);
                    then.status(200).json_body(json!({ "value": [] }));
                })
                .await;
        }
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path_contains("CotacaoMoedaPeriodo")
                    .query_param("@moeda", "'USD'")
                    .query_param("@dataInicial", "'10-16-2026'")
                    .query_param("$format", "json");
                then.status(200).json_body(json!({ "value": [
                    { "cotacaoCompra": 5.43, "cotacaoVenda": 5.441,
                      "dataHoraCotacao": "2026-10-16 11:04:29.147", "tipoBoletim": "Intermediário" },
                    { "cotacaoCompra": 5.42, "cotacaoVenda": 5.4321,
                      "dataHoraCotacao": "2026-10-16 10:07:31.512", "tipoBoletim": "Abertura" },
                    { "cotacaoCompra": 5.40, "cotacaoVenda": 5.40,
                      "dataHoraCotacao": "2026-10-15 13:11:02.000", "tipoBoletim": "Fechamento" }
                ]}));
            })
            .await;

        let fixings = feed(&server, 7).fixings(day(2026, 10, 18)).await.unwrap();
        assert_eq!(fixings.len(), 2);
        assert_eq!(fixings[0].value, 5.4321);
        assert_eq!(fixings[0].time_label(), "10:07:31");
        assert_eq!(fixings[1].value, 5.441);
        assert_eq!(fixings[1].date_label(), "16/10/2026");
    }

    #[tokio::test]
    async fn gives_up_after_lookback() {
        let server = MockServer::start_async().await;
        let empty = server
            .mock_async(|when, then| {
                when.method(GET).path_contains("CotacaoMoedaPeriodo");
                then.status(200).json_body(json!({ "value": [] }));
            })
            .await;
        let err = feed(&server, 2).fixings(day(2026, 10, 19)).await.unwrap_err();
        assert!(matches!(err, ProviderError::NoData(_)));
        empty.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn server_error_is_http() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.path_contains("CotacaoMoedaPeriodo");
                then.status(503);
            })
            .await;
        let err = feed(&server, 0).fixings(day(2026, 10, 19)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Http(_)));
    }

    #[test]
    fn timestamp_formats() {
        assert!(parse_timestamp("2026-10-16 10:07:31.512").is_ok());
        assert!(parse_timestamp("2026-10-16 10:07:31").is_ok());
        assert!(parse_timestamp("16/10/2026").is_err());
    }
}
