use std::path::PathBuf;

use anyhow::Context as _;
use url::Url;

use crate::cli::CleanArgs;
use crate::fields;
use crate::formats::{BookRecord, BookRow};

pub fn run(args: CleanArgs) -> anyhow::Result<()> {
    let input = PathBuf::from(&args.input);
    let out = PathBuf::from(&args.out);

    let rows = crate::store::read_rows(&input).context("read input table")?;
    let records = clean_rows(&rows);
    let cleaned: Vec<BookRow> = records.iter().map(BookRow::from).collect();
    crate::store::write_rows(&out, &cleaned).context("write cleaned table")?;

    tracing::info!(
        input = %input.display(),
        out = %out.display(),
        rows = rows.len(),
        kept = cleaned.len(),
        "cleaned table"
    );
    Ok(())
}

/// Coerces every row to its typed form, dropping rows without a usable detail URL.
pub fn clean_rows(rows: &[BookRow]) -> Vec<BookRecord> {
    rows.iter()
        .enumerate()
        .filter_map(|(idx, row)| match clean_row(row) {
            Some(record) => Some(record),
            None => {
                tracing::warn!(row = idx + 1, "row has no valid detail_url; dropping");
                None
            }
        })
        .collect()
}

/// Parses one row. Each field fails on its own: an unreadable price or rating
/// becomes absent while the rest of the row survives. Rows that are already
/// typed come back unchanged.
pub fn clean_row(row: &BookRow) -> Option<BookRecord> {
    let detail_url = row
        .detail_url
        .as_deref()
        .and_then(fields::non_empty)
        .and_then(|raw| Url::parse(&raw).ok())?;

    let cell = |value: &Option<String>| value.as_deref().and_then(fields::non_empty);

    let price = cell(&row.price).and_then(|text| {
        let parsed = fields::parse_price(&text);
        if parsed.is_none() {
            tracing::debug!(url = %detail_url, text = %text, "unparseable price");
        }
        parsed
    });
    let rating = cell(&row.rating).and_then(|text| {
        let parsed = fields::parse_rating_text(&text);
        if parsed.is_none() {
            tracing::debug!(url = %detail_url, text = %text, "unparseable rating");
        }
        parsed
    });
    let review_count = cell(&row.review_count).and_then(|text| fields::parse_review_count(&text));

    Some(BookRecord {
        title: cell(&row.title),
        detail_url,
        price,
        rating,
        review_count,
        availability: cell(&row.availability),
    })
}
