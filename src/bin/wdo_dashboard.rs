// src/bin/wdo_dashboard.rs
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wdocalc::config::DashboardConfig;
use wdocalc::publishing::{JsonPublisher, Publisher, StdoutPublisher};
use wdocalc::refresh::{Collaborators, Dashboard};

#[derive(Debug, Parser)]
#[command(name = "wdo_dashboard", about = "WDO fair value, opening and PTAX bands")]
struct Args {
    /// TOML config file (falls back to $WDO_CONFIG, then built-in defaults).
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Refresh once and exit.
    #[arg(long)]
    once: bool,
    /// Seconds between refreshes; overrides `refresh_interval_secs`.
    #[arg(long)]
    interval_secs: Option<u64>,
    /// Emit JSON instead of text tables.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = Arc::new(DashboardConfig::resolve(args.config.as_deref())?);
    let sources = Collaborators::from_config(&cfg)?;

    if args.json {
        serve(cfg, JsonPublisher { pretty: args.once }, sources, &args).await
    } else {
        serve(cfg, StdoutPublisher, sources, &args).await
    }
}

async fn serve<Pu>(
    cfg: Arc<DashboardConfig>,
    publisher: Pu,
    sources: Collaborators,
    args: &Args,
) -> anyhow::Result<()>
where
    Pu: Publisher + Send + Sync + 'static,
{
    let interval = args.interval_secs.unwrap_or(cfg.refresh_interval_secs);
    let dashboard = Dashboard::new(cfg, publisher, sources);

    if args.once || interval == 0 {
        dashboard.tick_once().await?;
        return Ok(());
    }

    tracing::info!(interval_secs = interval, "refreshing until interrupted");
    tokio::select! {
        _ = dashboard.run(Duration::from_secs(interval)) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
    Ok(())
}
