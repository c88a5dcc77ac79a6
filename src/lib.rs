//! Parallel scan of compressed JSONL archives for records by one author.
//!
//! Files are fanned out to a fixed-size worker pool; each worker streams its
//! archive line by line and hands back the matching records. The dispatcher
//! drains results in completion order and appends them to a single JSONL
//! output through [`ResultWriter`].

pub mod archive;
pub mod config;
pub mod dispatch;
pub mod filter;
pub mod normalize;
pub mod worker;
pub mod writer;

pub use archive::{ArchiveError, ArchiveFormat, ArchiveReader};
pub use config::{ConfigError, RunConfig};
pub use dispatch::{find_archives, format_elapsed, run, RunSummary, ScanConfig, ScanError, DEFAULT_WORKERS, OUTPUT_FILE_NAME};
pub use filter::{author_of, filter_line, parse_record, ParseError, Record};
pub use normalize::{normalize, NormalizedAuthor};
pub use worker::{process_file, FileScan, FileTask, MatchSet, TaskReport};
pub use writer::{ResultWriter, RunState};
