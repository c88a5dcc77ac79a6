use crate::archive::ArchiveFormat;
use crate::dispatch::{ScanConfig, DEFAULT_WORKERS};
use crate::normalize::normalize;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Optional YAML run configuration. Every key may be omitted.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub description: Option<String>,
    pub author: Option<String>,
    pub input_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub workers: Option<usize>,
    pub format: Option<ArchiveFormat>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to open run configuration {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to parse run configuration YAML from {path}: {source}")]
    Parse { path: PathBuf, source: serde_yaml::Error },
    #[error("failed to read {field} from input: {source}")]
    Prompt { field: &'static str, source: io::Error },
    #[error("target author '{0}' is empty after normalization")]
    EmptyAuthor(String),
    #[error("no input directory given")]
    MissingInputDir,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Open { path: path.to_path_buf(), source })?;
        serde_yaml::from_reader(file).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Fills unset keys from `fallback`; values already set win.
    pub fn or(self, fallback: RunConfig) -> RunConfig {
        RunConfig {
            description: self.description.or(fallback.description),
            author: self.author.or(fallback.author),
            input_dir: self.input_dir.or(fallback.input_dir),
            output: self.output.or(fallback.output),
            workers: self.workers.or(fallback.workers),
            format: self.format.or(fallback.format),
        }
    }
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, field: &'static str, question: &str) -> Result<String, ConfigError> {
    let prompt_err = |source| ConfigError::Prompt { field, source };
    write!(output, "{}", question).map_err(prompt_err)?;
    output.flush().map_err(prompt_err)?;
    let mut answer = String::new();
    input.read_line(&mut answer).map_err(prompt_err)?;
    Ok(answer.trim_end_matches(['\r', '\n']).to_string())
}

/// Builds the scan configuration, asking on `input`/`output` for the author
/// and input directory when neither flags nor the YAML file supplied them.
pub fn resolve<R: BufRead, W: Write>(merged: RunConfig, input: &mut R, output: &mut W) -> Result<ScanConfig, ConfigError> {
    let author = match merged.author {
        Some(author) => author,
        None => prompt(input, output, "author", "Type Author Name Here: ")?,
    };
    if normalize(&author).is_empty() {
        return Err(ConfigError::EmptyAuthor(author));
    }

    let input_dir = match merged.input_dir {
        Some(dir) => dir,
        None => {
            let answer = prompt(input, output, "input directory", "Paste the directory where the dataset is stored here: ")?;
            let answer = answer.trim();
            if answer.is_empty() {
                return Err(ConfigError::MissingInputDir);
            }
            PathBuf::from(answer)
        }
    };

    let mut config = ScanConfig::new(input_dir, author);
    if let Some(path) = merged.output {
        config.output_path = path;
    }
    config.workers = merged.workers.unwrap_or(DEFAULT_WORKERS);
    config.format = merged.format.unwrap_or_default();
    Ok(config)
}
