use std::time::Instant;
use tracing::{error, info};
use url::Url;

use rayon::prelude::*;

use crate::backend::{Ga4Client, ReportBackend};
use crate::dataset::{ReportDataset, ReportRow, RunOutcome};
use crate::error::{MissingInput, ReportError, ReportResult};
use crate::fetch::fetch;
use crate::params::ReportParams;
use crate::properties::{Property, PropertyDirectory};

/// How the report matrix is fetched.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workers: usize,
    pub check_regex: bool,
    pub api_base: Url,
}

/// One (property, regex) pair, tagged with its traversal position.
#[derive(Debug, Clone, Copy)]
struct MatrixCell<'a> {
    index: usize,
    property: &'a Property,
    regex: &'a str,
}

/// Input gate. Only the first failing check is reported.
pub fn validate_params(params: &ReportParams) -> ReportResult<()> {
    let has_credentials = params
        .credentials
        .as_ref()
        .is_some_and(|payload| !payload.is_empty());
    if !has_credentials {
        return Err(ReportError::MissingInput(MissingInput::Credentials));
    }
    if params.property_ids.is_empty() {
        return Err(ReportError::MissingInput(MissingInput::Sites));
    }
    if params.regexes.iter().all(|r| r.trim().is_empty()) {
        return Err(ReportError::MissingInput(MissingInput::Regex));
    }
    Ok(())
}

pub fn resolve_properties<'a>(
    directory: &'a PropertyDirectory,
    ids: &[String],
) -> ReportResult<Vec<&'a Property>> {
    ids.iter().map(|id| directory.lookup(id)).collect()
}

pub fn check_regexes(regexes: &[String]) -> ReportResult<()> {
    for pattern in regexes {
        if let Err(e) = regex::Regex::new(pattern) {
            return Err(ReportError::InvalidRegex {
                pattern: pattern.clone(),
                reason: e.to_string(),
            });
        }
    }
    Ok(())
}

/// Validates, builds the GA4 client once and fetches the whole matrix.
pub fn run_report(
    params: &ReportParams,
    directory: &PropertyDirectory,
    options: &RunOptions,
) -> ReportResult<RunOutcome> {
    let properties = prepare(params, directory, options)?;

    // prepare() has rejected a missing or empty payload
    let payload = params.credentials.as_deref().unwrap_or_default();
    let client = Ga4Client::from_service_account(payload, options.api_base.clone())?;

    fetch_matrix(&client, &properties, params, options.workers)
}

/// Same as [`run_report`] against an already-built backend.
pub fn run_with_backend<B: ReportBackend + Sync>(
    backend: &B,
    params: &ReportParams,
    directory: &PropertyDirectory,
    options: &RunOptions,
) -> ReportResult<RunOutcome> {
    let properties = prepare(params, directory, options)?;
    fetch_matrix(backend, &properties, params, options.workers)
}

/// Every check that needs no network: input gate, property lookup, regex syntax.
fn prepare<'a>(
    params: &ReportParams,
    directory: &'a PropertyDirectory,
    options: &RunOptions,
) -> ReportResult<Vec<&'a Property>> {
    validate_params(params)?;
    let properties = resolve_properties(directory, &params.property_ids)?;
    if options.check_regex {
        check_regexes(&params.regexes)?;
    }
    Ok(properties)
}

fn fetch_matrix<B: ReportBackend + Sync>(
    backend: &B,
    properties: &[&Property],
    params: &ReportParams,
    workers: usize,
) -> ReportResult<RunOutcome> {
    let start_time = Instant::now();

    // Property outer, regex inner; this order is the row order of the dataset.
    let cells: Vec<MatrixCell> = properties
        .iter()
        .flat_map(|property| params.regexes.iter().map(move |regex| (*property, regex.as_str())))
        .enumerate()
        .map(|(index, (property, regex))| MatrixCell {
            index,
            property,
            regex,
        })
        .collect();

    info!(
        action = "start",
        component = "report_matrix",
        property_count = properties.len(),
        regex_count = params.regexes.len(),
        cell_count = cells.len(),
        worker_count = workers,
        "Fetching report matrix"
    );

    let fetch_cell = |cell: &MatrixCell<'_>| {
        fetch(
            backend,
            &cell.property.id,
            &cell.property.display_name,
            cell.regex,
            params.start_date,
            params.end_date,
        )
    };

    let dataset = if workers <= 1 {
        let mut dataset = ReportDataset::new();
        for cell in &cells {
            let rows = fetch_cell(cell).inspect_err(|e| log_cell_failure(cell, e))?;
            dataset.extend(rows);
        }
        dataset
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ReportError::WorkerPool(e.to_string()))?;

        let mut results: Vec<(usize, ReportResult<Vec<ReportRow>>)> = pool.install(|| {
            cells
                .par_iter()
                .map(|cell| (cell.index, fetch_cell(cell)))
                .collect()
        });
        results.sort_by_key(|(index, _)| *index);
        reassemble(&cells, results)?
    };

    info!(
        action = "complete",
        component = "report_matrix",
        row_count = dataset.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Report matrix fetched"
    );

    Ok(RunOutcome::from(dataset))
}

/// Concatenates index-ordered results; the first failure in traversal order wins.
fn reassemble(
    cells: &[MatrixCell],
    results: Vec<(usize, ReportResult<Vec<ReportRow>>)>,
) -> ReportResult<ReportDataset> {
    let mut dataset = ReportDataset::new();
    for (index, result) in results {
        match result {
            Ok(rows) => dataset.extend(rows),
            Err(e) => {
                log_cell_failure(&cells[index], &e);
                return Err(e);
            }
        }
    }
    Ok(dataset)
}

fn log_cell_failure(cell: &MatrixCell, e: &ReportError) {
    error!(
        action = "fail",
        component = "report_matrix",
        cell_index = cell.index,
        property_id = %cell.property.id,
        regex = cell.regex,
        error = %e,
        "Report request failed, aborting run"
    );
}
