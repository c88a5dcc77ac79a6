use anyhow::{Context, Result};
use author_scan::{config, format_elapsed, run, ArchiveFormat, RunConfig};
use clap::Parser;
use log::{info, warn, LevelFilter};
use simple_logger::SimpleLogger;
use std::io;
use std::path::PathBuf;
use time::macros::format_description;

#[derive(Parser, Clone)]
#[command(name = "Author Scan")]
#[command(about = "Finds every record by one author across a directory of compressed JSONL archives.")]
#[command(version = "0.1.0")]
struct Cli {
    #[arg(short, long, help = "Target author name (prompted for when omitted)")]
    author: Option<String>,
    #[arg(short, long, help = "Directory holding the archives (prompted for when omitted)")]
    input_dir: Option<PathBuf>,
    #[arg(short, long, help = "Output JSONL path [default: <input-dir>/fic_list.jsonl]")]
    output: Option<PathBuf>,
    #[arg(short, long, help = "Number of worker threads (0 for one per CPU) [default: 6]")]
    workers: Option<usize>,
    #[arg(short, long, help = "Archive format: zst or gz [default: zst]")]
    format: Option<ArchiveFormat>,
    #[arg(long, help = "Path to an optional YAML run configuration file")]
    config: Option<PathBuf>,
    #[arg(short, long, default_value = "INFO", help = "Logging level (DEBUG, INFO, WARN, ERROR)")]
    log_level: String,
    #[arg(long, help = "Hide the progress bar")]
    no_progress: bool,
}

impl Cli {
    fn as_run_config(&self) -> RunConfig {
        RunConfig {
            description: None,
            author: self.author.clone(),
            input_dir: self.input_dir.clone(),
            output: self.output.clone(),
            workers: self.workers,
            format: self.format,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = match cli.log_level.to_uppercase().as_str() {
        "DEBUG" => LevelFilter::Debug,
        "INFO" => LevelFilter::Info,
        "WARN" | "WARNING" => LevelFilter::Warn,
        "ERROR" => LevelFilter::Error,
        _ => { eprintln!("Invalid log level '{}', defaulting to INFO.", cli.log_level); LevelFilter::Info }
    };
    SimpleLogger::new()
        .with_level(log_level)
        .with_timestamp_format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .init()?;
    info!("Starting Author Scan");

    let file_config = match &cli.config {
        Some(path) => {
            info!("Loading run configuration from: {}", path.display());
            let loaded = RunConfig::load(path)?;
            if let Some(description) = &loaded.description {
                info!("Run: {}", description);
            }
            loaded
        }
        None => RunConfig::default(),
    };
    let merged = cli.as_run_config().or(file_config);

    let stdin = io::stdin();
    let mut scan_config = config::resolve(merged, &mut stdin.lock(), &mut io::stdout())
        .context("Failed to resolve run configuration")?;
    scan_config.show_progress = !cli.no_progress;
    info!("Input directory: {}", scan_config.input_dir.display());
    info!("Output file: {}", scan_config.output_path.display());

    let summary = run(&scan_config)
        .with_context(|| format!("Scan of {} aborted", scan_config.input_dir.display()))?;

    info!("-------------------- FINAL SUMMARY --------------------");
    info!("Total execution time: {}", format_elapsed(summary.elapsed));
    info!("Archives found: {}", summary.files_total);
    info!("Archives processed: {}", summary.files_completed);
    if summary.files_failed > 0 {
        warn!("Archives with errors: {}", summary.files_failed);
    }
    info!("Matching records written: {}", summary.total_matches);
    info!("-------------------------------------------------------");
    println!("Done. Found {} matching entries written to {}.", summary.total_matches, summary.output_path.display());
    Ok(())
}
