use chrono::{NaiveDate, Utc};
use wdocalc::config::DashboardConfig;
use wdocalc::providers::ptax::PtaxFeed;
use wdocalc::providers::{http_client, FixingProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cfg = DashboardConfig::resolve(None)?;
    let day = match std::env::args().nth(1) {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")?,
        None => Utc::now().with_timezone(&cfg.tz()?).date_naive(),
    };
    let feed = PtaxFeed::from_config(&cfg, http_client(&cfg)?);
    for (i, f) in feed.fixings(day).await?.iter().enumerate() {
        println!("PTAX {} -> {:.4} at {} {}", i + 1, f.value, f.date_label(), f.time_label());
    }
    Ok(())
}
