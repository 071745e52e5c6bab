use time::macros::format_description;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

use crate::dataset::ReportDataset;
use crate::export::CSV_HEADER;

pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(LocalTime::new(format_description!(
            "[hour]:[minute]:[second].[subsecond digits:3]"
        )))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub fn format_number(num: u64) -> String {
    let digits = num.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Renders the dataset as an aligned text table, header first.
pub fn render_table(dataset: &ReportDataset) -> String {
    let body: Vec<[String; 5]> = dataset
        .rows()
        .iter()
        .map(|row| {
            [
                row.site.clone(),
                row.year_month.clone(),
                row.total_users.to_string(),
                row.pageviews.to_string(),
                row.regex.clone(),
            ]
        })
        .collect();

    let mut widths = CSV_HEADER.map(|h| h.chars().count());
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |cells: [&str; 5]| {
        cells
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                // numeric columns are right-aligned
                if i == 2 || i == 3 {
                    format!("{cell:>width$}")
                } else {
                    format!("{cell:<width$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format_line(CSV_HEADER));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for cells in &body {
        lines.push(format_line([
            cells[0].as_str(),
            cells[1].as_str(),
            cells[2].as_str(),
            cells[3].as_str(),
            cells[4].as_str(),
        ]));
    }
    lines.join("\n")
}

pub fn print_report(dataset: &ReportDataset) {
    println!("{}", render_table(dataset));
    println!(
        "\nData fetched: {} rows",
        format_number(dataset.len() as u64)
    );
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if let Some(workers) = args.workers {
        if workers == 0 {
            anyhow::bail!("--workers must be greater than 0");
        }
    }

    if args.workers.is_some() && args.parallel {
        anyhow::bail!("--workers and --parallel cannot be combined");
    }

    Ok(())
}

/// Worker count for the fetch matrix. Sequential unless asked otherwise.
pub fn worker_count(args: &crate::args::Args) -> usize {
    match (args.workers, args.parallel) {
        (Some(workers), _) => workers,
        (None, true) => std::cmp::min(num_cpus::get(), 8),
        (None, false) => 1,
    }
}
