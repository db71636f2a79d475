// src/providers/gold.rs
use once_cell::sync::Lazy;
use regex::Regex;

use super::{parse_number, GoldPriceProvider, ProviderError};
use crate::config::DashboardConfig;

static COMMERCIAL_INPUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<input\b[^>]*\bid\s*=\s*["']comercial["'][^>]*>"#).expect("static regex")
});
static VALUE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bvalue\s*=\s*["']([^"']*)["']"#).expect("static regex")
});

/// Scrapes the commercial gram price from the gold quote page.
pub struct GoldPage {
    pub http: reqwest::Client,
    pub url: String,
}

impl GoldPage {
    pub fn from_config(cfg: &DashboardConfig, http: reqwest::Client) -> Self {
        Self { http, url: cfg.gold_page_url.clone() }
    }
}

#[async_trait::async_trait]
impl GoldPriceProvider for GoldPage {
    async fn price_per_gram(&self) -> Result<f64, ProviderError> {
        let html = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        extract_commercial_price(&html)
    }
}

/// Value of `<input id="comercial" value="...">`, comma decimal separator.
pub fn extract_commercial_price(html: &str) -> Result<f64, ProviderError> {
    let tag = COMMERCIAL_INPUT
        .find(html)
        .ok_or_else(|| ProviderError::NoData("input#comercial not found".into()))?;
    let value = VALUE_ATTR
        .captures(tag.as_str())
        .and_then(|c| c.get(1))
        .ok_or_else(|| ProviderError::Parse("input#comercial has no value".into()))?;
    parse_number(value.as_str())
}
