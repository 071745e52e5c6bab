use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_OUTPUT: &str = "ga4_category_report.csv";
pub const DEFAULT_API_BASE: &str = "https://analyticsdata.googleapis.com/";

#[derive(Parser, Debug)]
#[command(
    name = "ga4-report",
    about = "Fetch monthly GA4 users and pageviews per site and page-path regex into a CSV report",
    version,
    long_about = None
)]
pub struct Args {
    /// Path to the GA4 service account JSON
    #[arg(short, long, env = "GA4_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// First day of the report (YYYY-MM-DD)
    #[arg(long, default_value = "2024-08-01")]
    pub start_date: NaiveDate,

    /// Last day of the report (YYYY-MM-DD, default: yesterday)
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Property id to report on (repeatable)
    #[arg(short, long = "site")]
    pub sites: Vec<String>,

    /// Page-path regex, matched against the full path (repeatable)
    #[arg(short, long = "regex")]
    pub regexes: Vec<String>,

    /// File with one page-path regex per line
    #[arg(long)]
    pub regex_file: Option<PathBuf>,

    /// Compile regexes locally before fetching (Rust regex syntax, stricter than RE2)
    #[arg(long)]
    pub check_regex: bool,

    /// CSV output path
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Path to custom property directory file
    #[arg(short, long)]
    pub properties: Option<PathBuf>,

    /// List known properties and exit
    #[arg(long)]
    pub list_properties: bool,

    /// Initialize properties.txt with the default property directory
    #[arg(long)]
    pub init: bool,

    /// GA4 Data API base URL
    #[arg(long, env = "GA4_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: url::Url,

    /// Number of concurrent report requests
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Fetch with one worker per CPU (up to 8)
    #[arg(long)]
    pub parallel: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
