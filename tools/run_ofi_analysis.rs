//! OFI Analysis Tool
//!
//! Loads a book snapshot file, computes multi-level OFI, regresses forward
//! returns on the aggregated signal and prints the result.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: data/BTC_1min.csv, 5 levels, sum, horizon 1
//! cargo run --release --bin run_ofi_analysis
//!
//! # From TOML config
//! cargo run --release --bin run_ofi_analysis -- --config configs/btc.toml
//!
//! # Generate sample config
//! cargo run --release --bin run_ofi_analysis -- --generate-config btc.toml
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` to change the level and pass
//! `--json-logs` for structured output.

use ofi_analysis::config::{ExperimentMetadata, PipelineConfig};
use ofi_analysis::logging::init_tracing;
use ofi_analysis::{OfiError, Pipeline};

fn main() {
    let mut args: Vec<String> = std::env::args().collect();
    let program = args.remove(0);

    let json_logs = args.iter().any(|a| a == "--json-logs");
    args.retain(|a| a != "--json-logs");
    init_tracing(json_logs);

    match args.first().map(String::as_str) {
        None => run(PipelineConfig::default()),
        Some("--config") => {
            let Some(path) = args.get(1) else {
                eprintln!("Error: --config requires a path argument");
                std::process::exit(1);
            };
            match PipelineConfig::load_toml(path) {
                Ok(config) => run(config),
                Err(e) => {
                    eprintln!("Failed to load config {path}: {e}");
                    std::process::exit(1);
                }
            }
        }
        Some("--generate-config") => {
            let Some(path) = args.get(1) else {
                eprintln!("Error: --generate-config requires a path argument");
                std::process::exit(1);
            };
            generate_sample_config(path);
        }
        Some("--help") | Some("-h") => print_usage(&program),
        Some(other) => {
            eprintln!("Unknown argument: {other}");
            print_usage(&program);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
OFI Analysis Tool

Usage:
    {program}                            Run with default settings
    {program} --config <path.toml>       Run from config file
    {program} --generate-config <path>   Generate sample config file
    {program} --help                     Show this help

Options:
    --json-logs                          Emit structured JSON logs on stderr
"#
    );
}

fn generate_sample_config(path: &str) {
    let config = PipelineConfig::default().with_metadata(ExperimentMetadata {
        name: "BTC multi-level OFI".to_string(),
        description: Some("Sum of five levels against one-step forward returns".to_string()),
        created_at: Some(chrono::Utc::now().to_rfc3339()),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        tags: Some(vec!["btc".to_string(), "ofi".to_string()]),
    });

    match config.save_toml(path) {
        Ok(()) => println!("Sample config written to {path}"),
        Err(e) => {
            eprintln!("Error generating config: {e}");
            std::process::exit(1);
        }
    }
}

fn run(config: PipelineConfig) {
    if let Err(e) = run_analysis(config) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run_analysis(config: PipelineConfig) -> Result<(), OfiError> {
    let pipeline = Pipeline::from_config(config)?;
    let output = pipeline.run()?;

    tracing::info!(
        rows_loaded = output.rows_loaded,
        rows_dropped = output.rows_dropped,
        rows_analyzed = output.rows_analyzed,
        "analysis complete"
    );

    println!("{}", output.regression);

    if let Some(plot) = pipeline.plot(&output)? {
        println!("\n{plot}");
    }

    Ok(())
}
