use chrono::NaiveDate;
use tracing::{debug, info};

use crate::backend::{ReportBackend, ReportRequest, ResponseRow, METRICS};
use crate::dataset::ReportRow;
use crate::error::{ReportError, ReportResult};

/// Fetches one (property, regex) cell of the report matrix and flattens the rows.
pub fn fetch<B: ReportBackend + ?Sized>(
    backend: &B,
    property_id: &str,
    site_name: &str,
    regex: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> ReportResult<Vec<ReportRow>> {
    let request = ReportRequest {
        property_id: property_id.to_string(),
        start_date,
        end_date,
        page_path_regex: regex.to_string(),
    };

    debug!(action = "start", component = "report_fetch", property = %request.property(), site = site_name, regex, "Fetching report");
    let response = backend.run_report(&request)?;

    let rows = response
        .iter()
        .map(|row| flatten_row(row, property_id, site_name, regex))
        .collect::<ReportResult<Vec<_>>>()?;

    info!(
        action = "complete",
        component = "report_fetch",
        property_id,
        site = site_name,
        regex,
        row_count = rows.len(),
        "Report fetched"
    );
    Ok(rows)
}

fn flatten_row(
    row: &ResponseRow,
    property_id: &str,
    site_name: &str,
    regex: &str,
) -> ReportResult<ReportRow> {
    let (year, month) = match row.dimension_values.as_slice() {
        [year, month, ..] => (year, month),
        values => {
            return Err(ReportError::MalformedResponse {
                property_id: property_id.to_string(),
                reason: format!("expected year and month dimensions, got {} values", values.len()),
            })
        }
    };

    Ok(ReportRow {
        site: site_name.to_string(),
        year_month: format_year_month(year, month),
        total_users: parse_metric(row, 0, property_id)?,
        pageviews: parse_metric(row, 1, property_id)?,
        regex: regex.to_string(),
    })
}

/// `<year>-<month>` with the month left-padded to two digits.
pub fn format_year_month(year: &str, month: &str) -> String {
    format!("{year}-{month:0>2}")
}

fn parse_metric(row: &ResponseRow, index: usize, property_id: &str) -> ReportResult<i64> {
    let metric = METRICS[index];
    let value = row.metric_values.get(index).map(String::as_str).unwrap_or("");
    value.trim().parse().map_err(|_| ReportError::MalformedMetric {
        property_id: property_id.to_string(),
        metric,
        value: value.to_string(),
    })
}
