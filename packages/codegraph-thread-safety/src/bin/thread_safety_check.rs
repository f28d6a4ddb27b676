/*
 * Thread-Safety Check CLI
 *
 * Runs the data race checker over a serialized program.
 *
 * Usage:
 *   thread-safety-check --program program.json
 *   thread-safety-check --program program.json --config thread-safety.yaml --format json
 *
 * Output formats:
 *   --format text    One line per violation plus its trace (default)
 *   --format json    Diagnostics and statistics (for CI parsing)
 *
 * Exit codes:
 *   0  no violations
 *   1  violations found
 *   2  analysis or input error
 *   3  configuration error
 */

use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use codegraph_thread_safety::{
    CheckReport, Program, Result, ThreadSafetyChecker, ThreadSafetyConfig,
};

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "thread-safety-check")]
#[command(about = "Summary-based thread-safety checker", long_about = None)]
struct Cli {
    /// Program to check (JSON: type environment plus procedures)
    #[arg(short, long)]
    program: PathBuf,

    /// YAML configuration file (`version: 1`)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Write every computed summary to this file as JSON
    #[arg(long)]
    dump_summaries: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(report) if report.has_violations() => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<CheckReport> {
    let config = match &cli.config {
        Some(path) => ThreadSafetyConfig::from_yaml(path)?,
        None => ThreadSafetyConfig::default(),
    };
    config.validate()?;

    let source = std::fs::read_to_string(&cli.program)?;
    let program = Program::from_json(&source)?;
    info!(
        program = %cli.program.display(),
        procedures = program.procedures().len(),
        "program loaded"
    );

    let checker = ThreadSafetyChecker::new(config);
    let report = checker.run(&program)?;

    if let Some(path) = &cli.dump_summaries {
        let summaries: BTreeMap<String, _> = checker
            .summaries()
            .into_iter()
            .map(|(name, summary)| (name.to_string(), summary))
            .collect();
        let dumped: BTreeMap<&str, _> = summaries
            .iter()
            .map(|(name, summary)| (name.as_str(), summary.as_ref()))
            .collect();
        std::fs::write(path, serde_json::to_string_pretty(&dumped)?)?;
    }

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => print_text(&report),
    }
    Ok(report)
}

fn print_text(report: &CheckReport) {
    for diagnostic in &report.diagnostics {
        println!("{}", diagnostic);
        for hop in &diagnostic.trace {
            println!("    {}: {}", hop.location, hop.description);
        }
    }
    println!(
        "{} file(s), {} procedure(s), {} summaries, {} violation(s)",
        report.stats.files,
        report.stats.procedures,
        report.stats.summaries_computed,
        report.diagnostics.len()
    );
}
