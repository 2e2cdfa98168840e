use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::cli::{RunArgs, ScrapeArgs};
use crate::config::{ScrapeOptions, Strategy};
use crate::enrich::{EnrichStats, enrich_review_counts};
use crate::extract::{Extractor, normalize_entry};
use crate::fetch::{Fetcher, HttpFetcher, PoliteFetcher};
use crate::formats::{BookRecord, BookRow, ListingEntry};
use crate::navigate::{HttpNavigator, Navigator};
use crate::paginate::{Termination, collect_navigated, collect_templated};

/// Everything one scrape produced, in listing order.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub entries: Vec<ListingEntry>,
    pub records: Vec<BookRecord>,
    pub pages_fetched: usize,
    pub pages_skipped: usize,
    pub termination: Termination,
    pub enrichment: Option<EnrichStats>,
}

impl ScrapeOutcome {
    pub fn rows(&self, raw: bool) -> Vec<BookRow> {
        if raw {
            // Review counts only exist on the enriched records.
            self.entries
                .iter()
                .zip(&self.records)
                .map(|(entry, record)| BookRow {
                    review_count: record.review_count.map(|count| count.to_string()),
                    ..BookRow::from(entry)
                })
                .collect()
        } else {
            self.records.iter().map(BookRow::from).collect()
        }
    }
}

pub async fn run(args: ScrapeArgs) -> anyhow::Result<()> {
    let options = ScrapeOptions::resolve(&args).context("resolve scrape options")?;
    scrape_to_file(&options).await?;
    Ok(())
}

/// `scrape` followed by `report` over the freshly scraped records.
pub async fn run_with_report(args: RunArgs) -> anyhow::Result<()> {
    let options = ScrapeOptions::resolve(&args.scrape).context("resolve scrape options")?;
    let outcome = scrape_to_file(&options).await?;
    crate::report::write_report(&outcome.records, Path::new(&args.report_dir), args.bins)
        .context("write report")?;
    Ok(())
}

async fn scrape_to_file(options: &ScrapeOptions) -> anyhow::Result<ScrapeOutcome> {
    let http = HttpFetcher::new(&options.http)?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(PoliteFetcher::new(http, options.delay));

    let outcome = scrape(options, fetcher).await?;
    crate::store::write_rows(&options.out, &outcome.rows(options.raw))
        .context("write output table")?;
    Ok(outcome)
}

/// Runs the configured pagination strategy over `fetcher`, then the optional
/// detail enrichment.
pub async fn scrape(
    options: &ScrapeOptions,
    fetcher: Arc<dyn Fetcher>,
) -> anyhow::Result<ScrapeOutcome> {
    let extractor = Arc::new(Extractor::new()?);
    match options.strategy {
        Strategy::Templated => {
            tracing::info!(
                template = options.url_template.as_str(),
                pages = options.pages,
                "scrape (templated)"
            );
            let collected = collect_templated(
                fetcher.as_ref(),
                &extractor,
                &options.url_template,
                options.pages,
            )
            .await?;
            finish(options, fetcher, extractor, collected).await
        }
        Strategy::Navigate => {
            tracing::info!(
                start_url = %options.start_url,
                pages = options.pages,
                "scrape (navigate)"
            );
            let mut navigator = HttpNavigator::new(
                Arc::clone(&fetcher),
                Arc::clone(&extractor),
                options.start_url.clone(),
                options.settle,
            );
            scrape_with_navigator(options, &mut navigator, fetcher, extractor).await
        }
    }
}

/// Same as [`scrape`] with navigation driven by a caller-supplied navigator.
pub async fn scrape_with_navigator(
    options: &ScrapeOptions,
    navigator: &mut dyn Navigator,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<Extractor>,
) -> anyhow::Result<ScrapeOutcome> {
    let collected = collect_navigated(navigator, &extractor, options.pages).await;
    finish(options, fetcher, extractor, collected).await
}

async fn finish(
    options: &ScrapeOptions,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<Extractor>,
    collected: crate::paginate::CollectedListing,
) -> anyhow::Result<ScrapeOutcome> {
    let mut records: Vec<BookRecord> = collected.entries.iter().map(normalize_entry).collect();

    let enrichment = if options.details {
        let stats = enrich_review_counts(
            &mut records,
            fetcher,
            extractor,
            options.detail_concurrency,
        )
        .await?;
        Some(stats)
    } else {
        None
    };

    tracing::info!(
        records = records.len(),
        pages_fetched = collected.pages_fetched,
        pages_skipped = collected.pages_skipped,
        termination = %collected.termination,
        "scrape finished"
    );
    if let Some(stats) = enrichment {
        tracing::info!(
            found = stats.found,
            missing = stats.missing,
            failed = stats.failed,
            "detail enrichment finished"
        );
    }

    Ok(ScrapeOutcome {
        entries: collected.entries,
        records,
        pages_fetched: collected.pages_fetched,
        pages_skipped: collected.pages_skipped,
        termination: collected.termination,
        enrichment,
    })
}
