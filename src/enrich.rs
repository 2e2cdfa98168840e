use std::sync::Arc;

use anyhow::Context as _;
use url::Url;

use crate::extract::Extractor;
use crate::fetch::Fetcher;
use crate::formats::BookRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub found: usize,
    pub missing: usize,
    pub failed: usize,
}

enum DetailOutcome {
    Found(u32),
    Missing,
    Failed(String),
}

/// Fills `review_count` from each record's detail page.
///
/// At most `concurrency` detail fetches are in flight; pacing is left to the
/// fetcher. A failed fetch or an unreadable value leaves the field absent.
pub async fn enrich_review_counts(
    records: &mut [BookRecord],
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<Extractor>,
    concurrency: usize,
) -> anyhow::Result<EnrichStats> {
    let mut stats = EnrichStats::default();
    if records.is_empty() {
        return Ok(stats);
    }

    let concurrency = concurrency.max(1).min(records.len());
    let urls: Vec<Url> = records.iter().map(|r| r.detail_url.clone()).collect();

    let mut join_set = tokio::task::JoinSet::new();
    let mut next_idx = 0usize;

    while next_idx < urls.len() || !join_set.is_empty() {
        while next_idx < urls.len() && join_set.len() < concurrency {
            let record_index = next_idx;
            let url = urls[record_index].clone();
            let fetcher = Arc::clone(&fetcher);
            let extractor = Arc::clone(&extractor);

            join_set.spawn(async move {
                let outcome = match fetcher.fetch(&url).await {
                    Ok(page) => match extractor.review_count(&page.body) {
                        Some(count) => DetailOutcome::Found(count),
                        None => DetailOutcome::Missing,
                    },
                    Err(err) => DetailOutcome::Failed(err.to_string()),
                };
                (record_index, outcome)
            });

            next_idx += 1;
        }

        let Some(joined) = join_set.join_next().await else {
            break;
        };
        let (record_index, outcome) = joined.context("join detail page task")?;
        let url = &urls[record_index];
        match outcome {
            DetailOutcome::Found(count) => {
                tracing::debug!(url = %url, review_count = count, "detail page enriched");
                records[record_index].review_count = Some(count);
                stats.found += 1;
            }
            DetailOutcome::Missing => {
                tracing::warn!(url = %url, "detail page has no readable review count");
                stats.missing += 1;
            }
            DetailOutcome::Failed(error) => {
                tracing::warn!(url = %url, error = %error, "detail page fetch failed");
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}
