use crate::archive::ArchiveFormat;
use crate::normalize::NormalizedAuthor;
use crate::worker::{FileTask, TaskReport};
use crate::writer::ResultWriter;
use crossbeam_channel::{unbounded, Receiver, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_WORKERS: usize = 6;
pub const OUTPUT_FILE_NAME: &str = "fic_list.jsonl";

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub input_dir: PathBuf,
    pub target_author: String,
    pub output_path: PathBuf,
    /// Worker pool width; 0 means one per logical CPU.
    pub workers: usize,
    pub format: ArchiveFormat,
    pub show_progress: bool,
}

impl ScanConfig {
    pub fn new(input_dir: impl Into<PathBuf>, target_author: impl Into<String>) -> Self {
        let input_dir = input_dir.into();
        Self {
            output_path: input_dir.join(OUTPUT_FILE_NAME),
            input_dir,
            target_author: target_author.into(),
            workers: DEFAULT_WORKERS,
            format: ArchiveFormat::default(),
            show_progress: true,
        }
    }

    pub fn resolved_workers(&self) -> usize {
        if self.workers == 0 { num_cpus::get() } else { self.workers }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to list input directory {dir}: {source}")]
    Listing { dir: PathBuf, source: io::Error },
    #[error("failed to create output file {path}: {source}")]
    Output { path: PathBuf, source: io::Error },
    #[error("failed to write matches to {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub files_total: usize,
    pub files_completed: usize,
    pub files_failed: usize,
    pub total_matches: usize,
    pub output_path: PathBuf,
    pub elapsed: Duration,
}

/// Regular files directly inside `dir` carrying the format's suffix, sorted.
pub fn find_archives(dir: &Path, format: ArchiveFormat) -> Result<Vec<PathBuf>, ScanError> {
    let listing_err = |source| ScanError::Listing { dir: dir.to_path_buf(), source };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(listing_err)? {
        let entry = entry.map_err(listing_err)?;
        let path = entry.path();
        if format.matches(&path) && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    if paths.is_empty() {
        warn!("No *{} files found in {}", format.suffix(), dir.display());
    }
    Ok(paths)
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, elapsed.subsec_millis())
    }
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    match ProgressStyle::default_bar().template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta} @ {per_sec}) {msg}") {
        Ok(style) => bar.set_style(style.progress_chars("=> ")),
        Err(e) => warn!("Falling back to default progress style: {}", e),
    }
    bar
}

/// Scans every archive in `config.input_dir` and writes matching records to
/// `config.output_path` in completion order.
///
/// Only a listing failure or an output failure aborts the run; per-file
/// errors are counted in the summary.
pub fn run(config: &ScanConfig) -> Result<RunSummary, ScanError> {
    let start = Instant::now();
    let mut files = find_archives(&config.input_dir, config.format)?;
    files.retain(|path| *path != config.output_path);
    let target = Arc::new(NormalizedAuthor::new(&config.target_author));
    info!("Found {} *{} files in {}; target author '{}'",
        files.len(), config.format.suffix(), config.input_dir.display(), target);

    let mut writer = ResultWriter::create(&config.output_path)
        .map_err(|source| ScanError::Output { path: config.output_path.clone(), source })?;

    let workers = config.resolved_workers();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("scan-worker-{}", i))
        .build()?;
    info!("Using {} worker threads", workers);

    let (sender, receiver): (Sender<TaskReport>, Receiver<TaskReport>) = unbounded();
    let files_total = files.len();
    for path in files {
        let task = FileTask::new(path, config.format);
        let target = Arc::clone(&target);
        let sender = sender.clone();
        pool.spawn(move || {
            let report = task.run(&target);
            // Only fails once the dispatcher has stopped draining.
            let _ = sender.send(report);
        });
    }
    drop(sender);

    let bar = progress_bar(files_total, config.show_progress);
    bar.set_message("Starting processing...");
    for report in receiver {
        let file_name = report.file_name();
        let status = if report.error.is_some() {
            writer.record_failure();
            "ERR"
        } else {
            "OK"
        };
        debug!("{}: {} ({} matches, {})", status, report.path.display(), report.matches.len(), format_elapsed(report.elapsed));
        writer
            .write(report.matches)
            .map_err(|source| ScanError::Write { path: config.output_path.clone(), source })?;
        bar.set_message(format!("{} matches so far | {}: {}", writer.state().total_matches, status, file_name));
        bar.inc(1);
    }

    let state = writer
        .finish()
        .map_err(|source| ScanError::Write { path: config.output_path.clone(), source })?;
    bar.finish_with_message(format!("Done. {} matches, {} files failed.", state.total_matches, state.files_failed));

    Ok(RunSummary {
        files_total,
        files_completed: state.files_completed,
        files_failed: state.files_failed,
        total_matches: state.total_matches,
        output_path: config.output_path.clone(),
        elapsed: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn listing_skips_other_suffixes_and_directories() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.zst"), b"").unwrap();
        fs::write(dir.path().join("a.zst"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::write(dir.path().join(OUTPUT_FILE_NAME), b"").unwrap();
        fs::create_dir(dir.path().join("nested.zst")).unwrap();

        let found = find_archives(dir.path(), ArchiveFormat::Zstd).unwrap();
        assert_eq!(found, vec![dir.path().join("a.zst"), dir.path().join("b.zst")]);
    }

    #[test]
    fn missing_directory_is_listing_error() {
        let dir = tempdir().unwrap();
        let err = find_archives(&dir.path().join("absent"), ArchiveFormat::Zstd).unwrap_err();
        assert!(matches!(err, ScanError::Listing { .. }));
    }

    #[test]
    fn default_config_points_output_into_input_dir() {
        let config = ScanConfig::new("/data/dumps", "Jane Doe");
        assert_eq!(config.output_path, PathBuf::from("/data/dumps/fic_list.jsonl"));
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.format, ArchiveFormat::Zstd);
    }

    #[test]
    fn zero_workers_means_all_cpus() {
        let mut config = ScanConfig::new("/tmp", "x");
        config.workers = 0;
        assert_eq!(config.resolved_workers(), num_cpus::get());
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(Duration::from_millis(1_250)), "1.250s");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_elapsed(Duration::from_secs(3_725)), "1h 2m 5s");
    }
}
