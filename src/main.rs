use clap::Parser;
use log::{info, warn};
use psychro_pipeline::config::{load_config, PipelineConfig};
use psychro_pipeline::errors::PipelineError;
use psychro_pipeline::metrics::METRICS;
use psychro_pipeline::parallel::{expand_inputs, ParallelProcessor};
use psychro_pipeline::time_operation;
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "psychro_pipeline")]
#[command(about = "Derive VPD, humidity ratio, enthalpy and dew point from hourly weather-station CSV exports", long_about = None)]
struct Args {
    /// CSV files, directories or glob patterns
    #[arg(required = true, env = "WEATHER_DATA_INPUTS", value_delimiter = ',')]
    inputs: Vec<String>,

    /// JSON configuration file
    #[arg(long, env = "PSYCHRO_CONFIG")]
    config: Option<PathBuf>,

    /// Directory receiving the derived CSV files
    #[arg(long, env = "PSYCHRO_OUTPUT_DIR", default_value = "derived")]
    output_dir: PathBuf,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(long)]
    workers: Option<usize>,

    /// Divisor turning the pressure column into kPa (overrides the config)
    #[arg(long)]
    pressure_divisor: Option<f64>,

    /// Parse and derive without writing output files
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(divisor) = args.pressure_divisor {
        config.pressure_divisor = divisor;
    }
    config.validate()?;

    let inputs = time_operation!("discover_inputs", expand_inputs(&args.inputs));
    if inputs.is_empty() {
        return Err(Box::new(PipelineError::NoInputs(args.inputs.clone())));
    }
    info!("Found {} hourly exports", inputs.len());

    let processor = match args.workers {
        Some(workers) => ParallelProcessor::with_workers(workers),
        None => ParallelProcessor::new(),
    };
    let output_dir = if args.dry_run {
        None
    } else {
        Some(args.output_dir.as_path())
    };

    let results = time_operation!(
        "process_files",
        processor.process_files(&inputs, &config, output_dir)
    );

    let failed: Vec<_> = results.iter().filter(|r| r.result.is_err()).collect();
    for result in &failed {
        if let Err(e) = &result.result {
            warn!("{}: {}", result.file_path.display(), e);
        }
    }

    METRICS.lock().print_summary();

    if !results.is_empty() && failed.len() == results.len() {
        return Err(format!("all {} input files failed", failed.len()).into());
    }
    Ok(())
}
