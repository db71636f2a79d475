// src/providers/sheet.rs
//! The trading workbook: quotes on the first worksheet (`Asset`,
//! `Fechamento Anterior`, `Último`) and the volatility support value in one
//! cell of the support worksheet.
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use tokio::sync::Mutex;

use super::{parse_number, ProviderError, SheetSource};
use crate::config::{CellRef, DashboardConfig};
use crate::types::SheetQuotes;

const COL_ASSET: &str = "Asset";
const COL_PRIOR_CLOSE: &str = "Fechamento Anterior";
const COL_LAST: &str = "Último";

const ASSET_CONTRACT: &str = "WDOFUT";
const ASSET_SPOT: &str = "USD/BRL";
const ASSET_RATE_FUTURE: &str = "DI1FUT";
const ASSET_FORWARD_POINTS: &str = "FRP0";

pub struct Workbook {
    pub path: PathBuf,
    pub support_sheet: String,
    pub support_cell: CellRef,
    /// Fetched into `path` when the file is missing.
    pub remote_url: Option<String>,
    pub http: reqwest::Client,
    fetch: Mutex<()>,
}

impl Workbook {
    pub fn new(
        path: PathBuf,
        support_sheet: String,
        support_cell: CellRef,
        remote_url: Option<String>,
        http: reqwest::Client,
    ) -> Self {
        Self { path, support_sheet, support_cell, remote_url, http, fetch: Mutex::new(()) }
    }

    pub fn from_config(cfg: &DashboardConfig, http: reqwest::Client) -> Result<Self, ProviderError> {
        let support_cell = cfg
            .support_cell_ref()
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        Ok(Self::new(
            cfg.workbook_path.clone(),
            cfg.support_sheet.clone(),
            support_cell,
            cfg.workbook_url.clone(),
            http,
        ))
    }

    /// Both reads run concurrently during a refresh; the lock keeps them to one download.
    async fn ensure_local(&self) -> Result<(), ProviderError> {
        let _guard = self.fetch.lock().await;
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(());
        }
        let Some(url) = &self.remote_url else {
            return Err(ProviderError::NoData(format!("{} not found", self.path.display())));
        };
        tracing::info!(%url, path = %self.path.display(), "downloading workbook");
        let body = self.http.get(url).send().await?.error_for_status()?.bytes().await?;
        let partial = self.path.with_extension("part");
        tokio::fs::write(&partial, &body).await?;
        tokio::fs::rename(&partial, &self.path).await?;
        Ok(())
    }

    /// `None` selects the first worksheet.
    async fn worksheet(&self, name: Option<&str>) -> Result<Range<Data>, ProviderError> {
        self.ensure_local().await?;
        let path = self.path.clone();
        let name = name.map(str::to_owned);
        tokio::task::spawn_blocking(move || read_worksheet(&path, name.as_deref())).await?
    }
}

#[async_trait::async_trait]
impl SheetSource for Workbook {
    async fn quotes(&self) -> Result<SheetQuotes, ProviderError> {
        let range = self.worksheet(None).await?;
        parse_quotes(&range)
    }

    async fn vol_support(&self) -> Result<f64, ProviderError> {
        let range = self.worksheet(Some(self.support_sheet.as_str())).await?;
        cell_value(&range, self.support_cell)
    }
}

fn read_worksheet(path: &Path, name: Option<&str>) -> Result<Range<Data>, ProviderError> {
    let mut book = open_workbook_auto(path)?;
    match name {
        Some(name) => Ok(book.worksheet_range(name)?),
        None => Ok(book
            .worksheet_range_at(0)
            .ok_or_else(|| ProviderError::NoData("workbook has no worksheets".into()))??),
    }
}

fn number(cell: &Data) -> Option<f64> {
    let v = match cell {
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        Data::String(s) => parse_number(s).ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn is_text(cell: &Data, expected: &str) -> bool {
    matches!(cell, Data::String(s) if s.trim() == expected)
}

/// The first row is the header. Missing required columns reject the whole
/// sheet; a missing asset row only leaves that field empty.
pub fn parse_quotes(range: &Range<Data>) -> Result<SheetQuotes, ProviderError> {
    let mut rows = range.rows();
    let headers = rows
        .next()
        .ok_or_else(|| ProviderError::NoData("quotes sheet is empty".into()))?;
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| is_text(h, name))
            .ok_or_else(|| ProviderError::Parse(format!("missing column {name:?}")))
    };
    let asset_col = column(COL_ASSET)?;
    let prior_col = column(COL_PRIOR_CLOSE)?;
    let last_col = column(COL_LAST)?;

    let mut out = SheetQuotes::default();
    for row in rows {
        let Some(Data::String(asset)) = row.get(asset_col) else { continue };
        let field = |col: usize| row.get(col).and_then(number);
        // First row per asset wins.
        match asset.trim() {
            ASSET_CONTRACT => out.contract_prior_close = out.contract_prior_close.or(field(prior_col)),
            ASSET_SPOT => out.spot_rate = out.spot_rate.or(field(prior_col)),
            ASSET_RATE_FUTURE => out.rate_future_level = out.rate_future_level.or(field(last_col)),
            ASSET_FORWARD_POINTS => out.forward_points = out.forward_points.or(field(last_col)),
            _ => {}
        }
    }
    Ok(out)
}

/// Reads `cell` by absolute sheet position, wherever the used range starts.
pub fn cell_value(range: &Range<Data>, cell: CellRef) -> Result<f64, ProviderError> {
    let label = format!("r{}c{}", cell.row + 1, cell.col + 1);
    let out_of_range = || ProviderError::NoData(format!("cell {label} out of range"));
    let pos = (
        u32::try_from(cell.row).map_err(|_| out_of_range())?,
        u32::try_from(cell.col).map_err(|_| out_of_range())?,
    );
    match range.get_value(pos) {
        None => Err(out_of_range()),
        Some(Data::Empty) => Err(ProviderError::NoData(format!("cell {label} is empty"))),
        Some(v) => number(v).ok_or_else(|| ProviderError::Parse(format!("not a number: {v}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/ddeprofit.xlsx");

    fn s(v: &str) -> Data {
        Data::String(v.into())
    }

    fn quotes_range(rows: &[[Data; 3]]) -> Range<Data> {
        let mut r = Range::new((0, 0), (rows.len() as u32 - 1, 2));
        for (i, row) in rows.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                r.set_value((i as u32, j as u32), v.clone());
            }
        }
        r
    }

    fn header() -> [Data; 3] {
        [s("Asset"), s("Fechamento Anterior"), s("Último")]
    }

    fn workbook(path: PathBuf, remote_url: Option<String>) -> Workbook {
        Workbook::new(
            path,
            "base_b3".into(),
            CellRef { row: 18, col: 6 },
            remote_url,
            reqwest::Client::new(),
        )
    }

    #[test]
    fn quotes_are_lifted_by_asset_and_column() {
        let range = quotes_range(&[
            header(),
            [s(" WDOFUT "), Data::Float(5400.5), Data::Float(5410.0)],
            [s("USD/BRL"), s("5,3912"), Data::Float(5.40)],
            [s("DI1FUT"), Data::Float(0.1065), Data::Float(0.1070)],
            [s("FRP0"), Data::Empty, Data::Int(12)],
            [s("WDOFUT"), Data::Float(1.0), Data::Float(1.0)],
        ]);
        let q = parse_quotes(&range).unwrap();
        assert_eq!(q.contract_prior_close, Some(5400.5));
        assert_eq!(q.spot_rate, Some(5.3912));
        assert_eq!(q.rate_future_level, Some(0.1070));
        assert_eq!(q.forward_points, Some(12.0));
    }

    #[test]
    fn missing_asset_is_a_missing_field() {
        let range = quotes_range(&[header(), [s("WDOFUT"), Data::Float(5400.0), Data::Float(5401.0)]]);
        let q = parse_quotes(&range).unwrap();
        assert_eq!(q.contract_prior_close, Some(5400.0));
        assert_eq!(q.spot_rate, None);
        assert_eq!(q.rate_future_level, None);
    }

    #[test]
    fn missing_column_rejects_sheet() {
        let range = quotes_range(&[
            [s("Asset"), s("Último"), Data::Empty],
            [s("WDOFUT"), Data::Float(5401.0), Data::Empty],
        ]);
        let err = parse_quotes(&range).unwrap_err();
        assert!(err.to_string().contains("Fechamento Anterior"));
    }

    #[test]
    fn support_cell_is_absolute() {
        // Used range starts at B2; G19 still addresses row 19, column 7.
        let mut range = Range::new((1, 1), (19, 7));
        for r in 1..20u32 {
            for c in 1..8u32 {
                range.set_value((r, c), Data::Float(f64::from(r * 10 + c)));
            }
        }
        assert_eq!(cell_value(&range, CellRef::parse("G19").unwrap()).unwrap(), 186.0);
        assert!(matches!(
            cell_value(&range, CellRef::parse("G40").unwrap()),
            Err(ProviderError::NoData(_))
        ));
        assert!(matches!(
            cell_value(&range, CellRef::parse("A1").unwrap()),
            Err(ProviderError::NoData(_))
        ));
        range.set_value((18, 6), s("n/d"));
        assert!(matches!(
            cell_value(&range, CellRef::parse("G19").unwrap()),
            Err(ProviderError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn reads_quotes_and_support_from_one_workbook() {
        let book = workbook(PathBuf::from(FIXTURE), None);
        let q = book.quotes().await.unwrap();
        assert_eq!(q.contract_prior_close, Some(5400.5));
        assert_eq!(q.spot_rate, Some(5.3912));
        assert_eq!(q.rate_future_level, Some(0.107));
        assert_eq!(q.forward_points, Some(12.5));
        assert_eq!(book.vol_support().await.unwrap(), 186.0);
    }

    #[tokio::test]
    async fn unknown_support_sheet_is_an_error() {
        let mut book = workbook(PathBuf::from(FIXTURE), None);
        book.support_sheet = "missing".into();
        assert!(matches!(book.vol_support().await, Err(ProviderError::Workbook(_))));
    }

    #[tokio::test]
    async fn missing_workbook_without_remote_is_no_data() {
        let book = workbook(std::env::temp_dir().join("wdocalc-does-not-exist.xlsx"), None);
        assert!(matches!(book.quotes().await, Err(ProviderError::NoData(_))));
        assert!(matches!(book.vol_support().await, Err(ProviderError::NoData(_))));
    }

    #[tokio::test]
    async fn downloads_missing_workbook_once_for_both_reads() {
        let bytes = std::fs::read(FIXTURE).unwrap();
        let server = httpmock::MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/ddeprofit.xlsx");
                then.status(200).body(bytes);
            })
            .await;
        let path = std::env::temp_dir().join(format!("wdocalc-dl-{}.xlsx", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let book = workbook(path.clone(), Some(server.url("/ddeprofit.xlsx")));

        let (quotes, support) = tokio::join!(book.quotes(), book.vol_support());
        assert_eq!(quotes.unwrap().contract_prior_close, Some(5400.5));
        assert_eq!(support.unwrap(), 186.0);
        // Later reads use the cached file.
        book.vol_support().await.unwrap();
        mock.assert_hits_async(1).await;
        let _ = std::fs::remove_file(&path);
    }
}
