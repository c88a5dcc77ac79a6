use crate::archive::{ArchiveError, ArchiveFormat, ArchiveReader};
use crate::filter::{classify_line, LineOutcome, Record};
use crate::normalize::NormalizedAuthor;
use log::{debug, error};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Matching records from one file, in line order.
pub type MatchSet = Vec<Record>;

/// One input file, consumed by exactly one worker.
#[derive(Debug, Clone)]
pub struct FileTask {
    pub path: PathBuf,
    pub format: ArchiveFormat,
}

/// What a worker hands back to the dispatcher.
#[derive(Debug)]
pub struct TaskReport {
    pub path: PathBuf,
    pub matches: MatchSet,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl TaskReport {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl FileTask {
    pub fn new(path: PathBuf, format: ArchiveFormat) -> Self {
        Self { path, format }
    }

    /// Runs the task with every archive error contained. A file that fails
    /// to open reports no matches; one that fails to decode part-way keeps
    /// the matches read before the failure.
    pub fn run(self, target: &NormalizedAuthor) -> TaskReport {
        let start = Instant::now();
        let scan = process_file(&self.path, self.format, target);
        let error = scan.error.map(|e| {
            error!("Error processing {} ({} matches kept): {}", self.path.display(), scan.matches.len(), e);
            e.to_string()
        });
        TaskReport { path: self.path, matches: scan.matches, error, elapsed: start.elapsed() }
    }
}

/// Matches found in one archive, plus the error that ended the scan early.
#[derive(Debug, Default)]
pub struct FileScan {
    pub matches: MatchSet,
    pub error: Option<ArchiveError>,
}

/// Scans one archive for records by `target`. The reader is dropped on every
/// exit path, including a decode failure part-way through.
pub fn process_file(path: &Path, format: ArchiveFormat, target: &NormalizedAuthor) -> FileScan {
    let reader = match ArchiveReader::open(path, format) {
        Ok(reader) => reader,
        Err(e) => return FileScan { matches: MatchSet::new(), error: Some(e) },
    };
    let mut scan = FileScan::default();
    let mut blank = 0usize;
    let mut unparseable = 0usize;
    let mut lines = 0usize;

    for line in reader {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                scan.error = Some(e);
                break;
            }
        };
        lines += 1;
        match classify_line(&line, target) {
            LineOutcome::Matched(record) => scan.matches.push(record),
            LineOutcome::Blank => blank += 1,
            LineOutcome::Unparseable => unparseable += 1,
            LineOutcome::Skipped => {}
        }
    }

    debug!("Finished {}: Lines={}, Blank={}, Unparseable={}, Matched={}, Failed={}",
        path.display(), lines, blank, unparseable, scan.matches.len(), scan.error.is_some());
    scan
}
