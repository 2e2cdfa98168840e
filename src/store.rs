use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context as _;

use crate::formats::BookRow;

/// Writes `rows` as UTF-8 CSV with a header row, creating parent directories.
/// An existing file is replaced.
pub fn write_rows(path: &Path, rows: &[BookRow]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }

    let file =
        File::create(path).with_context(|| format!("create output file: {}", path.display()))?;
    write_rows_to(file, rows).with_context(|| format!("write csv: {}", path.display()))?;

    tracing::info!(path = %path.display(), rows = rows.len(), "wrote table");
    Ok(())
}

pub fn write_rows_to<W: Write>(writer: W, rows: &[BookRow]) -> anyhow::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        // serde only emits the header together with the first record
        csv.write_record(HEADER).context("write csv header")?;
    }
    for row in rows {
        csv.serialize(row).context("serialize csv row")?;
    }
    csv.flush().context("flush csv")?;
    Ok(())
}

pub fn read_rows(path: &Path) -> anyhow::Result<Vec<BookRow>> {
    let file = File::open(path).with_context(|| format!("open csv: {}", path.display()))?;
    read_rows_from(file).with_context(|| format!("read csv: {}", path.display()))
}

pub fn read_rows_from<R: Read>(reader: R) -> anyhow::Result<Vec<BookRow>> {
    let mut csv = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for (idx, row) in csv.deserialize::<BookRow>().enumerate() {
        let row = row.with_context(|| format!("parse csv row {}", idx + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

const HEADER: [&str; 6] = [
    "title",
    "detail_url",
    "price",
    "rating",
    "review_count",
    "availability",
];
