use crate::filter::Record;
use crate::worker::MatchSet;
use log::{error, info};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Per-run counters. Only the [`ResultWriter`] mutates them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
    pub files_completed: usize,
    pub files_failed: usize,
    pub total_matches: usize,
}

/// Single-writer JSONL sink for matched records.
pub struct ResultWriter {
    path: PathBuf,
    out: BufWriter<File>,
    state: RunState,
    finished: bool,
}

impl ResultWriter {
    /// Creates the output file, discarding anything already at `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        info!("Writing matches to {}", path.display());
        Ok(Self { path: path.to_path_buf(), out: BufWriter::new(file), state: RunState::default(), finished: false })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Appends one file's matches, one JSON document per line, and returns
    /// how many were written.
    pub fn write(&mut self, records: MatchSet) -> io::Result<usize> {
        let count = records.len();
        for record in &records {
            self.write_record(record)?;
        }
        self.state.total_matches += count;
        self.state.files_completed += 1;
        Ok(count)
    }

    pub fn record_failure(&mut self) {
        self.state.files_failed += 1;
    }

    fn write_record(&mut self, record: &Record) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")
    }

    /// Flushes the stream and returns the final counters.
    pub fn finish(mut self) -> io::Result<RunState> {
        self.out.flush()?;
        self.finished = true;
        Ok(self.state)
    }
}

impl Drop for ResultWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.out.flush() {
            error!("Error flushing {} during cleanup: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parse_record;
    use tempfile::tempdir;

    #[test]
    fn writes_one_line_per_record_and_counts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let mut writer = ResultWriter::create(&path).unwrap();

        let first = vec![parse_record(r#"{"id":1}"#).unwrap(), parse_record(r#"{"id":2}"#).unwrap()];
        assert_eq!(writer.write(first).unwrap(), 2);
        assert_eq!(writer.write(MatchSet::new()).unwrap(), 0);
        writer.record_failure();
        assert_eq!(writer.write(vec![parse_record(r#"{"id":3}"#).unwrap()]).unwrap(), 1);

        let state = writer.finish().unwrap();
        assert_eq!(state, RunState { files_completed: 3, files_failed: 1, total_matches: 3 });
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"id\":1}\n{\"id\":2}\n{\"id\":3}\n");
    }

    #[test]
    fn create_truncates_previous_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        std::fs::write(&path, "stale\nstale\n").unwrap();

        let writer = ResultWriter::create(&path).unwrap();
        writer.finish().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn drop_flushes_pending_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        {
            let mut writer = ResultWriter::create(&path).unwrap();
            writer.write(vec![parse_record(r#"{"id":9}"#).unwrap()]).unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"id\":9}\n");
    }
}
