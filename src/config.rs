// src/config.rs
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("read {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("parse {}: {source}", path.display())]
    Toml { path: PathBuf, source: toml::de::Error },
    #[error("invalid cell reference {0:?}")]
    Cell(String),
    #[error("unknown timezone {0:?}")]
    Timezone(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tickers {
    #[serde(default = "d_contract")]     pub contract: String,
    #[serde(default = "d_brl_usd")]      pub brl_usd: String,
    #[serde(default = "d_gold")]         pub gold: String,
    #[serde(default = "d_dollar_index")] pub dollar_index: String,
}
fn d_contract() -> String { "6L=F".into() }
fn d_brl_usd() -> String { "BRLUSD=X".into() }
fn d_gold() -> String { "GC=F".into() }
fn d_dollar_index() -> String { "DX-Y.NYB".into() }

impl Default for Tickers {
    fn default() -> Self {
        Self {
            contract: d_contract(),
            brl_usd: d_brl_usd(),
            gold: d_gold(),
            dollar_index: d_dollar_index(),
        }
    }
}

/// Built once at startup and handed to each collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]                         pub tickers: Tickers,
    #[serde(default = "d_market_data_url")]   pub market_data_url: String,
    #[serde(default = "d_gold_page_url")]     pub gold_page_url: String,
    #[serde(default = "d_ptax_url")]          pub ptax_url: String,
    #[serde(default = "d_user_agent")]        pub user_agent: String,
    #[serde(default = "d_workbook_path")]     pub workbook_path: PathBuf,
    #[serde(default = "d_workbook_url")]      pub workbook_url: Option<String>, // fetched when the file is missing
    #[serde(default = "d_support_sheet")]     pub support_sheet: String,
    #[serde(default = "d_support_cell")]      pub support_cell: String,
    #[serde(default = "d_http_timeout_ms")]   pub http_timeout_ms: u64,
    #[serde(default = "d_http_retries")]      pub http_retries: usize,
    #[serde(default = "d_ptax_lookback")]     pub ptax_lookback_days: u32,
    #[serde(default = "d_timezone")]          pub timezone: String,
    #[serde(default)]                         pub refresh_interval_secs: u64,
}
fn d_market_data_url() -> String { "https://query1.finance.yahoo.com".into() }
fn d_gold_page_url() -> String { "https://www.melhorcambio.com/ouro-hoje".into() }
fn d_ptax_url() -> String { "https://olinda.bcb.gov.br/olinda/servico/PTAX/versao/v1/odata".into() }
fn d_user_agent() -> String { "Mozilla/5.0".into() }
fn d_workbook_path() -> PathBuf { "ddeprofit.xlsx".into() }
fn d_workbook_url() -> Option<String> {
    Some("https://raw.githubusercontent.com/Mvrsant/calculoswdo/main/ddeprofit.xlsx".into())
}
fn d_support_sheet() -> String { "base_b3".into() }
fn d_support_cell() -> String { "G19".into() }
fn d_http_timeout_ms() -> u64 { 10_000 }
fn d_http_retries() -> usize { 2 }
fn d_ptax_lookback() -> u32 { 7 }
fn d_timezone() -> String { "America/Sao_Paulo".into() }

#[inline]
pub fn ms(d: u64) -> Duration { Duration::from_millis(d) }

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            tickers: Tickers::default(),
            market_data_url: d_market_data_url(),
            gold_page_url: d_gold_page_url(),
            ptax_url: d_ptax_url(),
            user_agent: d_user_agent(),
            workbook_path: d_workbook_path(),
            workbook_url: d_workbook_url(),
            support_sheet: d_support_sheet(),
            support_cell: d_support_cell(),
            http_timeout_ms: d_http_timeout_ms(),
            http_retries: d_http_retries(),
            ptax_lookback_days: d_ptax_lookback(),
            timezone: d_timezone(),
            refresh_interval_secs: 0,
        }
    }
}

impl DashboardConfig {
    pub fn from_toml_str(path: &Path, raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(raw)
            .map_err(|source| ConfigError::Toml { path: path.to_path_buf(), source })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(path, &raw)
    }

    /// Reads `path` if given, else `$WDO_CONFIG`, else defaults; then applies
    /// `WDO_WORKBOOK_PATH` / `WDO_WORKBOOK_URL` overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os("WDO_CONFIG").map(PathBuf::from);
        let mut cfg = match path.map(Path::to_path_buf).or(from_env) {
            Some(p) => Self::load(&p)?,
            None => Self::default(),
        };
        if let Some(p) = std::env::var_os("WDO_WORKBOOK_PATH") {
            cfg.workbook_path = p.into();
        }
        if let Ok(url) = std::env::var("WDO_WORKBOOK_URL") {
            cfg.workbook_url = Some(url).filter(|u| !u.is_empty());
        }
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        CellRef::parse(&self.support_cell)?;
        self.tz()?;
        Ok(())
    }

    pub fn tz(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| ConfigError::Timezone(self.timezone.clone()))
    }

    pub fn support_cell_ref(&self) -> Result<CellRef, ConfigError> {
        CellRef::parse(&self.support_cell)
    }

    pub fn http_timeout(&self) -> Duration {
        ms(self.http_timeout_ms)
    }
}

/// Zero-based spreadsheet coordinates parsed from an A1 reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn parse(a1: &str) -> Result<Self, ConfigError> {
        let bad = || ConfigError::Cell(a1.to_string());
        let a1 = a1.trim();
        let split = a1.find(|c: char| c.is_ascii_digit()).ok_or_else(bad)?;
        let (letters, digits) = a1.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(bad());
        }
        let col = letters
            .chars()
            .try_fold(0usize, |acc, c| {
                let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
                acc.checked_mul(26)?.checked_add(digit)
            })
            .ok_or_else(bad)?
            - 1;
        let row: usize = digits.parse().map_err(|_| bad())?;
        if row == 0 {
            return Err(bad());
        }
        Ok(Self { row: row - 1, col })
    }
}
