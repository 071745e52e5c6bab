use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, warn};

use ga4_report::{
    export, init_default_properties, properties, run_report, utils, Args, ReportParams,
    RunOptions, RunOutcome,
};

fn run(args: &Args) -> Result<ExitCode> {
    let directory = properties::load_property_directory(args.properties.as_deref())?;

    if args.list_properties {
        for property in directory.iter() {
            println!("{} ({})", property.display_name, property.id);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let params = ReportParams::from_args(args)?;
    let options = RunOptions {
        workers: utils::worker_count(args),
        check_regex: args.check_regex,
        api_base: args.api_base.clone(),
    };

    let total_start_time = Instant::now();
    let outcome = match run_report(&params, &directory, &options) {
        Ok(outcome) => outcome,
        Err(e) if e.is_missing_input() => {
            eprintln!("{}", e);
            return Ok(ExitCode::from(2));
        }
        Err(e) => {
            error!(action = "fail", component = "report", error = %e, "Report run failed");
            eprintln!("Error: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    match outcome {
        RunOutcome::Data(dataset) => {
            utils::print_report(&dataset);
            export::export_csv(&dataset, &args.output)?;
            println!("CSV written to {}", args.output.display());
        }
        RunOutcome::NoData => {
            warn!(action = "complete", component = "report", "No data returned");
            println!("No data returned");
        }
    }

    info!(
        action = "complete",
        component = "report",
        duration_ms = total_start_time.elapsed().as_millis(),
        "Report run completed"
    );
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let args = Args::parse();
    utils::setup_logging(args.verbose);

    if args.init {
        return match init_default_properties() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        };
    }

    if let Err(e) = utils::validate_args(&args) {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(2);
    }

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            error!(action = "fail", component = "main", error = %format!("{:#}", e), "Run aborted");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
