use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::cli::ReportArgs;
use crate::fields::{Price, Rating};
use crate::formats::{BookRecord, HistogramBin, RatingMean, ReportSummary};

pub const DEFAULT_BINS: usize = 20;

pub const AVG_PRICE_CHART: &str = "avg_price_per_rating.svg";
pub const HISTOGRAM_CHART: &str = "price_histogram.svg";
pub const SUMMARY_JSON: &str = "summary.json";

pub fn run(args: ReportArgs) -> anyhow::Result<()> {
    let input = PathBuf::from(&args.input);
    let rows = crate::store::read_rows(&input).context("read input table")?;
    let records = crate::clean::clean_rows(&rows);
    write_report(&records, Path::new(&args.out), args.bins)?;
    Ok(())
}

/// Writes both charts and `summary.json` into `out_dir`.
pub fn write_report(
    records: &[BookRecord],
    out_dir: &Path,
    bins: usize,
) -> anyhow::Result<ReportSummary> {
    let summary = summarize(records, bins)?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create report dir: {}", out_dir.display()))?;

    let bar_path = out_dir.join(AVG_PRICE_CHART);
    std::fs::write(&bar_path, render_mean_price_chart(&summary.mean_price_by_rating))
        .with_context(|| format!("write chart: {}", bar_path.display()))?;

    let hist_path = out_dir.join(HISTOGRAM_CHART);
    std::fs::write(&hist_path, render_histogram_chart(&summary.histogram))
        .with_context(|| format!("write chart: {}", hist_path.display()))?;

    let summary_path = out_dir.join(SUMMARY_JSON);
    let json = serde_json::to_vec_pretty(&summary).context("serialize report summary")?;
    std::fs::write(&summary_path, json)
        .with_context(|| format!("write summary: {}", summary_path.display()))?;

    tracing::info!(
        out = %out_dir.display(),
        rows = summary.rows,
        priced = summary.priced,
        "wrote report"
    );
    Ok(summary)
}

pub fn summarize(records: &[BookRecord], bins: usize) -> anyhow::Result<ReportSummary> {
    let prices: Vec<Price> = records.iter().filter_map(|r| r.price).collect();
    let mean_price = (!prices.is_empty())
        .then(|| prices.iter().map(|p| p.cents()).sum::<u64>() as f64 / prices.len() as f64 / 100.0);

    Ok(ReportSummary {
        generated_at: chrono::Utc::now().to_rfc3339(),
        rows: records.len(),
        priced: prices.len(),
        rated: records.iter().filter(|r| r.rating.is_some()).count(),
        min_price: prices.iter().min().copied(),
        max_price: prices.iter().max().copied(),
        mean_price,
        mean_price_by_rating: mean_price_by_rating(records),
        histogram: price_histogram(records, bins)?,
    })
}

/// Mean price per rating, ascending by rating. Records missing either field are ignored.
pub fn mean_price_by_rating(records: &[BookRecord]) -> Vec<RatingMean> {
    let mut groups: BTreeMap<Rating, (u64, usize)> = BTreeMap::new();
    for record in records {
        let (Some(rating), Some(price)) = (record.rating, record.price) else {
            continue;
        };
        let group = groups.entry(rating).or_default();
        group.0 += price.cents();
        group.1 += 1;
    }

    groups
        .into_iter()
        .map(|(rating, (cents, count))| RatingMean {
            rating,
            mean_price: cents as f64 / count as f64 / 100.0,
            count,
        })
        .collect()
}

/// Equal-width histogram of prices over `[min, max]`; the last bin is closed.
pub fn price_histogram(records: &[BookRecord], bins: usize) -> anyhow::Result<Vec<HistogramBin>> {
    if bins == 0 {
        anyhow::bail!("histogram needs at least one bin");
    }

    let values: Vec<f64> = records
        .iter()
        .filter_map(|r| r.price)
        .map(Price::as_f64)
        .collect();
    let (Some(min), Some(max)) = (
        values.iter().copied().reduce(f64::min),
        values.iter().copied().reduce(f64::max),
    ) else {
        return Ok(Vec::new());
    };

    let (low, high) = if min == max { (min, min + 1.0) } else { (min, max) };
    let width = (high - low) / bins as f64;

    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|idx| HistogramBin {
            lower: low + width * idx as f64,
            upper: if idx + 1 == bins {
                high
            } else {
                low + width * (idx + 1) as f64
            },
            count: 0,
        })
        .collect();

    for value in values {
        let idx = (((value - low) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    Ok(out)
}

const CHART_WIDTH: f64 = 640.0;
const CHART_HEIGHT: f64 = 400.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 60.0;

struct Bar {
    label: String,
    value: f64,
}

pub fn render_mean_price_chart(means: &[RatingMean]) -> String {
    let bars: Vec<Bar> = means
        .iter()
        .map(|m| Bar {
            label: m.rating.to_string(),
            value: m.mean_price,
        })
        .collect();
    render_bars(
        "Average price per rating",
        "Rating (stars)",
        "Average price (GBP)",
        &bars,
        "#87ceeb",
        0.2,
    )
}

pub fn render_histogram_chart(bins: &[HistogramBin]) -> String {
    let bars: Vec<Bar> = bins
        .iter()
        .map(|bin| Bar {
            label: format!("{:.0}", bin.lower),
            value: bin.count as f64,
        })
        .collect();
    render_bars(
        "Distribution of book prices",
        "Price (GBP)",
        "Number of books",
        &bars,
        "#fa8072",
        0.0,
    )
}

fn render_bars(
    title: &str,
    x_label: &str,
    y_label: &str,
    bars: &[Bar],
    fill: &str,
    gap: f64,
) -> String {
    let plot_w = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = MARGIN_TOP + plot_h;
    let peak = bars.iter().map(|b| b.value).fold(0.0_f64, f64::max);
    let scale = if peak > 0.0 { plot_h / peak } else { 0.0 };

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{CHART_WIDTH}" height="{CHART_HEIGHT}" viewBox="0 0 {CHART_WIDTH} {CHART_HEIGHT}" font-family="sans-serif" font-size="12">"#
    );
    let _ = writeln!(
        svg,
        r#"<rect width="{CHART_WIDTH}" height="{CHART_HEIGHT}" fill="white"/>"#
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="24" text-anchor="middle" font-size="16">{}</text>"#,
        CHART_WIDTH / 2.0,
        escape_xml(title)
    );

    if !bars.is_empty() {
        let slot = plot_w / bars.len() as f64;
        let bar_w = slot * (1.0 - gap);
        for (idx, bar) in bars.iter().enumerate() {
            let x = MARGIN_LEFT + slot * idx as f64 + (slot - bar_w) / 2.0;
            let h = bar.value * scale;
            let _ = writeln!(
                svg,
                r#"<rect x="{x:.2}" y="{:.2}" width="{bar_w:.2}" height="{h:.2}" fill="{fill}" stroke="black" stroke-width="0.5"><title>{}: {:.2}</title></rect>"#,
                baseline - h,
                escape_xml(&bar.label),
                bar.value
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.2}" y="{:.2}" text-anchor="middle">{}</text>"#,
                x + bar_w / 2.0,
                baseline + 16.0,
                escape_xml(&bar.label)
            );
        }
    }

    let _ = writeln!(
        svg,
        r#"<line x1="{MARGIN_LEFT}" y1="{baseline}" x2="{}" y2="{baseline}" stroke="black"/>"#,
        MARGIN_LEFT + plot_w
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{baseline}" stroke="black"/>"#
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{baseline}" text-anchor="end">0</text>"#,
        MARGIN_LEFT - 6.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="end">{peak:.2}</text>"#,
        MARGIN_LEFT - 6.0,
        MARGIN_TOP + 4.0
    );
    let _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle">{}</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        CHART_HEIGHT - 16.0,
        escape_xml(x_label)
    );
    let _ = writeln!(
        svg,
        r#"<text x="18" y="{0}" text-anchor="middle" transform="rotate(-90 18 {0})">{1}</text>"#,
        MARGIN_TOP + plot_h / 2.0,
        escape_xml(y_label)
    );
    svg.push_str("</svg>\n");
    svg
}

fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
