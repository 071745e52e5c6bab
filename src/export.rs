use anyhow::{Context, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::dataset::{ReportDataset, ReportRow};

pub const CSV_HEADER: [&str; 5] = ["Site", "Year_Month", "Total_Users", "Pageviews", "Regex"];
pub const CSV_MIME: &str = "text/csv";

/// Writes the header and every row verbatim, in dataset order.
pub fn write_csv<W: Write>(dataset: &ReportDataset, writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(CSV_HEADER)?;
    for row in dataset.rows() {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_bytes(dataset: &ReportDataset) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(dataset, &mut buf)?;
    Ok(buf)
}

pub fn read_csv<R: Read>(reader: R) -> Result<ReportDataset> {
    let mut csv_reader = csv::Reader::from_reader(reader);

    let header = csv_reader.headers()?.clone();
    if header.iter().ne(CSV_HEADER) {
        anyhow::bail!("Unexpected CSV header: {:?}", header);
    }

    let rows = csv_reader
        .deserialize::<ReportRow>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to parse report rows")?;
    Ok(ReportDataset::from(rows))
}

pub fn export_csv(dataset: &ReportDataset, path: &Path) -> Result<()> {
    let start_time = Instant::now();
    info!(action = "start", component = "csv_export", path = ?path, "Writing CSV report");

    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    write_csv(dataset, file)?;

    info!(
        action = "complete",
        component = "csv_export",
        path = ?path,
        row_count = dataset.len(),
        mime = CSV_MIME,
        duration_ms = start_time.elapsed().as_millis(),
        "CSV report written"
    );
    Ok(())
}
