use anyhow::{Context, Result};
use chrono::{Days, Local, NaiveDate};
use std::fs;
use tracing::info;

use crate::args::Args;

/// Everything one run needs, as supplied by the operator. Nothing here is validated;
/// see [`crate::report::validate_params`].
#[derive(Debug, Clone)]
pub struct ReportParams {
    pub credentials: Option<Vec<u8>>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub property_ids: Vec<String>,
    pub regexes: Vec<String>,
}

impl ReportParams {
    pub fn from_args(args: &Args) -> Result<Self> {
        let credentials = match &args.credentials {
            Some(path) => Some(
                fs::read(path)
                    .with_context(|| format!("Failed to read credentials file {:?}", path))?,
            ),
            None => None,
        };

        let property_ids = select_properties(&args.sites);

        // The regex file is only read once the credentials and sites gates would pass,
        // so a missing earlier input is reported ahead of a regex file error.
        let mut regex_text = args.regexes.join("\n");
        let earlier_gates_pass =
            credentials.as_ref().is_some_and(|c| !c.is_empty()) && !property_ids.is_empty();
        if let (Some(path), true) = (&args.regex_file, earlier_gates_pass) {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read regex file {:?}", path))?;
            regex_text.push('\n');
            regex_text.push_str(&content);
        }

        let end_date = match args.end_date {
            Some(date) => date,
            None => default_end_date(),
        };

        let params = Self {
            credentials,
            start_date: args.start_date,
            end_date,
            property_ids,
            regexes: split_regex_text(&regex_text),
        };

        info!(
            action = "collect",
            component = "parameters",
            has_credentials = params.credentials.is_some(),
            start_date = %params.start_date,
            end_date = %params.end_date,
            property_count = params.property_ids.len(),
            regex_count = params.regexes.len(),
            "Collected report parameters"
        );
        Ok(params)
    }
}

/// One pattern per non-blank line, trimmed, in order. Duplicates are kept.
pub fn split_regex_text(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keeps selection order; repeated ids collapse to their first occurrence.
pub fn select_properties(ids: &[String]) -> Vec<String> {
    let mut selected: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids.iter().map(|id| id.trim()).filter(|id| !id.is_empty()) {
        if !selected.iter().any(|s| s == id) {
            selected.push(id.to_string());
        }
    }
    selected
}

pub fn default_end_date() -> NaiveDate {
    let today = Local::now().date_naive();
    today.checked_sub_days(Days::new(1)).unwrap_or(today)
}
