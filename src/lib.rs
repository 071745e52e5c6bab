pub mod args;
pub mod backend;
pub mod credentials;
pub mod dataset;
pub mod error;
pub mod export;
pub mod fetch;
pub mod params;
pub mod properties;
pub mod report;
pub mod utils;

pub use args::Args;
pub use backend::{Ga4Client, ReportBackend, ReportRequest, ResponseRow};
pub use dataset::{ReportDataset, ReportRow, RunOutcome};
pub use error::{MissingInput, ReportError, ReportResult};
pub use fetch::fetch;
pub use params::ReportParams;
pub use properties::{init_default_properties, Property, PropertyDirectory};
pub use report::{run_report, run_with_backend, RunOptions};
