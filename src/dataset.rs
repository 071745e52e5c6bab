use serde::{Deserialize, Serialize};

/// One flattened response row. Field names match the exported CSV header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "Site")]
    pub site: String,
    #[serde(rename = "Year_Month")]
    pub year_month: String,
    #[serde(rename = "Total_Users")]
    pub total_users: i64,
    #[serde(rename = "Pageviews")]
    pub pageviews: i64,
    #[serde(rename = "Regex")]
    pub regex: String,
}

/// Rows in arrival order: property, then regex, then response row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportDataset {
    rows: Vec<ReportRow>,
}

impl ReportDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, rows: Vec<ReportRow>) {
        self.rows.extend(rows);
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<ReportRow>> for ReportDataset {
    fn from(rows: Vec<ReportRow>) -> Self {
        Self { rows }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Data(ReportDataset),
    NoData,
}

impl From<ReportDataset> for RunOutcome {
    fn from(dataset: ReportDataset) -> Self {
        if dataset.is_empty() {
            RunOutcome::NoData
        } else {
            RunOutcome::Data(dataset)
        }
    }
}
