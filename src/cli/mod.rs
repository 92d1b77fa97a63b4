/*
* WiFiMon Analysis Command Line Interface
* ---------------------------------------
* @project: wifimon-analysis
*
* Command Structure:
* ------------------
* wifimon-analysis [--config DIR]
* ├── analyze   // fetch -> Hampel -> PNG, one shot
* ├── serve     // same pipeline behind the HTTP API
* └── init      // writes config/default.toml from the built-in defaults
*
* `analyze` talks to the configured Elasticsearch store unless --records
* points at a JSON dump, in which case the dump is the store. Handy for
* replaying an incident without credentials.
*
* Usage Examples:
* ---------------
* ```bash
* wifimon-analysis analyze --series downloadThroughput --tool NetTest -w 5 -n 3 -d 7
* wifimon-analysis analyze -s rssi -t boomerang --records dump.json --base64
* wifimon-analysis serve --port 8888
* ```
*/

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tokio::runtime::Runtime;
use tracing::{error, info};

use crate::config::{generate_default_config, Settings};
use crate::core::DetectionRequest;
use crate::errors::AnalysisResult;
use crate::pipeline::{AnalysisPipeline, AnalysisReport};
use crate::store::{ElasticStore, InMemoryStore, MeasurementStore};

#[derive(Parser)]
#[command(name = "wifimon-analysis")]
#[command(about = "Hampel outlier analysis for WiFiMon measurements", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, value_name = "CONFIG_DIR", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a series, flag outliers and render it
    Analyze(AnalyzeArgs),
    /// Start the API server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Generate default configuration
    Init {
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Measurement field to analyse, e.g. downloadThroughput
    #[arg(short, long)]
    series: String,
    /// Exact Test-Tool tag to keep
    #[arg(short, long)]
    tool: String,
    /// Half-window radius k
    #[arg(short, long)]
    window: Option<usize>,
    #[arg(short, long)]
    n_sigma: Option<f64>,
    /// Lookback in days
    #[arg(short, long)]
    days: Option<u32>,
    #[arg(short, long, default_value = "analysis.png")]
    output: PathBuf,
    /// Print the PNG as base64 on stdout instead of writing a file
    #[arg(long)]
    base64: bool,
    /// JSON array of records to use instead of the configured store
    #[arg(long, value_name = "FILE")]
    records: Option<PathBuf>,
}

impl AnalyzeArgs {
    fn to_request(&self, settings: &Settings) -> DetectionRequest {
        DetectionRequest {
            window_size: self.window.unwrap_or(settings.detection.window_size),
            n_sigma: self.n_sigma.unwrap_or(settings.detection.n_sigma),
            lookback_days: self.days.unwrap_or(settings.detection.lookback_days),
            source_field: self.series.clone(),
            tool_filter: self.tool.clone(),
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::from_dir(path)?,
        None => Settings::new()?,
    };

    match cli.command {
        Commands::Analyze(args) => handle_analyze_command(&args, &settings)?,
        Commands::Serve { port } => {
            let server_port = port.unwrap_or(settings.server.port);
            info!("Starting server on port {}", server_port);
            let runtime = Runtime::new()?;
            runtime.block_on(crate::api::serve(settings, server_port))?;
        }
        Commands::Init { force } => {
            let config_dir = cli.config.unwrap_or_else(|| PathBuf::from("config"));
            handle_init_command(config_dir, force)?;
        }
    }

    Ok(())
}

fn run_pipeline<S: MeasurementStore>(
    store: S,
    settings: &Settings,
    request: &DetectionRequest,
) -> AnalysisResult<AnalysisReport> {
    AnalysisPipeline::new(store, settings).run(request)
}

fn handle_analyze_command(args: &AnalyzeArgs, settings: &Settings) -> anyhow::Result<()> {
    let request = args.to_request(settings);

    let report = match &args.records {
        Some(path) => run_pipeline(InMemoryStore::from_json_file(path)?, settings, &request)?,
        None => run_pipeline(ElasticStore::new(&settings.store)?, settings, &request)?,
    };

    print_summary(&request, &report);

    if args.base64 {
        println!("{}", report.artifact.to_base64());
    } else {
        std::fs::write(&args.output, &report.artifact.bytes)
            .with_context(|| format!("writing {}", args.output.display()))?;
        eprintln!("{} Image written to {}", "✓".green(), args.output.display());
    }

    Ok(())
}

fn print_summary(request: &DetectionRequest, report: &AnalysisReport) {
    eprintln!(
        "{} {} / {} (k = {}, n_sigma = {}, last {} days)",
        "WiFiMon Analysis:".bold(),
        request.source_field,
        request.tool_filter,
        request.window_size,
        request.n_sigma,
        request.lookback_days
    );
    eprintln!("  points:   {}", report.series.len());

    let flagged = report.outliers.len().to_string();
    eprintln!(
        "  outliers: {}",
        if report.outliers.is_empty() { flagged.green() } else { flagged.red() }
    );
    for point in report.outlier_points() {
        eprintln!(
            "    #{:<6} {}  value {}",
            point.index,
            format_timestamp(point.timestamp),
            point.value
        );
    }

    if report.skipped_records > 0 {
        eprintln!("  skipped:  {} records without a usable value", report.skipped_records);
    }
    if let Some(truncated) = report.truncated {
        eprintln!("{} {}", "!".yellow(), truncated.to_string().yellow());
    }
}

fn format_timestamp(epoch_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| epoch_ms.to_string())
}

fn handle_init_command(config_dir: PathBuf, force: bool) -> anyhow::Result<()> {
    let target = config_dir.join("default.toml");
    if target.exists() && !force {
        error!("{} already exists. Use --force to overwrite.", target.display());
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    let config_str = toml::to_string_pretty(&generate_default_config())?;
    std::fs::write(&target, config_str)?;

    println!("{} Default configuration generated at {}", "✓".green(), target.display());
    Ok(())
}
