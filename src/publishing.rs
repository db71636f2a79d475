// src/publishing.rs
use std::fmt::{self, Write as _};

use crate::refresh::RefreshReport;
use crate::types::{PriceBand, FIXING_SLOTS};

#[async_trait::async_trait]
pub trait Publisher: Send + Sync + 'static {
    /// Publish one refresh worth of results.
    async fn publish(&self, report: &RefreshReport) -> anyhow::Result<()>;
}

/// Prints the dashboard as plain-text tables.
pub struct StdoutPublisher;

#[async_trait::async_trait]
impl Publisher for StdoutPublisher {
    async fn publish(&self, report: &RefreshReport) -> anyhow::Result<()> {
        println!("{}", render_text(report));
        Ok(())
    }
}

/// Prints the report as one JSON document.
pub struct JsonPublisher {
    pub pretty: bool,
}

#[async_trait::async_trait]
impl Publisher for JsonPublisher {
    async fn publish(&self, report: &RefreshReport) -> anyhow::Result<()> {
        let out = if self.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        println!("{out}");
        Ok(())
    }
}

const NA: &str = "N/A";

fn num(v: Option<f64>, dp: usize) -> String {
    v.map_or_else(|| NA.to_string(), |x| format!("{x:.dp$}"))
}

pub fn render_text(report: &RefreshReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = render(report, &mut out);
    out
}

fn render(r: &RefreshReport, out: &mut impl fmt::Write) -> fmt::Result {
    let snap = &r.inputs.snapshot;
    let m = &r.output.metrics;

    writeln!(out, "WDO dashboard @ {}", r.generated_at.format("%d/%m/%Y %H:%M:%S"))?;

    for table in &r.quote_tables {
        writeln!(out, "\n## {} ({})", table.name, table.ticker)?;
        writeln!(out, "{:<8} {:>12} {:>12}", "Metric", "Quote", "Implied")?;
        for row in &table.rows {
            writeln!(out, "{:<8} {:>12.5} {:>12}", row.metric, row.quote, num(row.implied, 2))?;
        }
    }

    writeln!(out, "\n## Loaded data")?;
    writeln!(out, "{:<22} {}", "Expiration", r.inputs.expiration.format("%d/%m/%Y"))?;
    writeln!(out, "{:<22} {}", "Business days left", num_u32(snap.business_days_to_expiration))?;
    match &r.inputs.sheet {
        Some(q) => {
            writeln!(out, "{:<22} {}", "WDOFUT prior close", num(q.contract_prior_close, 4))?;
            writeln!(out, "{:<22} {}", "USD/BRL prior close", num(q.spot_rate, 4))?;
            writeln!(out, "{:<22} {}", "DI1FUT last", num(q.rate_future_level, 5))?;
            writeln!(out, "{:<22} {}", "FRP0 last", num(q.forward_points, 4))?;
        }
        None => writeln!(out, "quotes sheet unavailable")?,
    }

    writeln!(out, "\n## Calculated opening")?;
    for (label, value) in [
        ("Gold spot (USD/oz)", num(snap.gold_spot_usd, 2)),
        ("Gold (BRL/g)", num(snap.gold_local_price_per_gram, 2)),
        ("Gold parity", num(m.gold_parity, 4)),
        ("Estimated opening", num(m.estimated_opening, 4)),
        ("Index variation %", num(snap.index_variation_pct, 2)),
        ("Over", num(m.carry_rate, 5)),
        ("Fair value", num(m.fair_value, 4)),
    ] {
        writeln!(out, "{label:<22} {value}")?;
    }

    if let Some(band) = &r.output.opening_band {
        writeln!(out, "\n## Opening bands (vol support {})", num(r.inputs.vol_support, 4))?;
        write_band_rows(out, &[Some(band)], &["Value"])?;
    }

    let available = r.inputs.fixings.available();
    writeln!(
        out,
        "\n## PTAX fixings {available}/{FIXING_SLOTS} ({}% complete)",
        available * 100 / FIXING_SLOTS
    )?;
    for (i, f) in r.inputs.fixings.iter_present() {
        writeln!(out, "PTAX {i}: {:.4} at {} {}", f.value, f.date_label(), f.time_label())?;
    }
    if let Some(d) = &r.output.displacement {
        writeln!(out, "Displacement {:.5} ({:.4} pts)", d.value, d.points)?;
    }
    if r.output.fixing_bands.count() > 0 {
        let present: Vec<(String, Option<&PriceBand>)> = (0..FIXING_SLOTS)
            .filter_map(|i| r.output.fixing_bands.get(i).map(|b| (format!("PTAX {}", i + 1), Some(b))))
            .collect();
        let headers: Vec<&str> = present.iter().map(|(h, _)| h.as_str()).collect();
        let bands: Vec<Option<&PriceBand>> = present.iter().map(|(_, b)| *b).collect();
        write_band_rows(out, &bands, &headers)?;
    } else if available > 0 {
        writeln!(out, "PTAX bands unavailable: opening, over and vol support are required")?;
    }
    if let Some(s) = &r.output.fixing_summary {
        writeln!(
            out,
            "Mean 1st max {:.2} | mean 1st min {:.2} | amplitude {:.2}",
            s.mean_first_max, s.mean_first_min, s.amplitude
        )?;
    }

    if !r.inputs.diagnostics.is_empty() {
        writeln!(out, "\n## Unavailable inputs")?;
        for d in &r.inputs.diagnostics {
            writeln!(out, "- {d}")?;
        }
    }
    Ok(())
}

fn num_u32(v: Option<u32>) -> String {
    v.map_or_else(|| NA.to_string(), |x| x.to_string())
}

fn write_band_rows(
    out: &mut impl fmt::Write,
    bands: &[Option<&PriceBand>],
    headers: &[&str],
) -> fmt::Result {
    write!(out, "{:<10}", "Band")?;
    for h in headers {
        write!(out, " {h:>10}")?;
    }
    writeln!(out)?;
    let rows: [(&str, fn(&PriceBand) -> f64); 4] = [
        ("1st max", |b| b.first_max),
        ("1st min", |b| b.first_min),
        ("2nd max", |b| b.second_max),
        ("2nd min", |b| b.second_min),
    ];
    for (label, pick) in rows {
        write!(out, "{label:<10}")?;
        for band in bands {
            write!(out, " {:>10}", num(band.map(pick), 2))?;
        }
        writeln!(out)?;
    }
    Ok(())
}
