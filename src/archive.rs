use flate2::read::MultiGzDecoder;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Compression format of the input archives. One format is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    #[default]
    #[serde(alias = "zst")]
    Zstd,
    #[serde(alias = "gz")]
    Gzip,
}

impl ArchiveFormat {
    pub fn suffix(self) -> &'static str {
        match self {
            ArchiveFormat::Zstd => ".zst",
            ArchiveFormat::Gzip => ".jsonl.gz",
        }
    }

    pub fn matches(self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.ends_with(self.suffix()))
    }

    fn decoder(self, file: File) -> io::Result<Box<dyn Read + Send>> {
        Ok(match self {
            ArchiveFormat::Zstd => Box::new(zstd::stream::read::Decoder::new(file)?),
            ArchiveFormat::Gzip => Box::new(MultiGzDecoder::new(file)),
        })
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveFormat::Zstd => f.write_str("zst"),
            ArchiveFormat::Gzip => f.write_str("gz"),
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zst" | "zstd" => Ok(ArchiveFormat::Zstd),
            "gz" | "gzip" => Ok(ArchiveFormat::Gzip),
            other => Err(format!("unknown archive format '{}' (expected zst or gz)", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to decode {path} after line {line}: {source}")]
    Decode { path: PathBuf, line: usize, source: io::Error },
}

/// Lazy, single-pass sequence of decoded text lines from one archive.
///
/// Iteration stops after the first decode failure; build a new reader to
/// scan the file again.
pub struct ArchiveReader {
    path: PathBuf,
    lines: Lines<BufReader<Box<dyn Read + Send>>>,
    lines_read: usize,
    failed: bool,
}

impl ArchiveReader {
    pub fn open(path: &Path, format: ArchiveFormat) -> Result<Self, ArchiveError> {
        let file = File::open(path).map_err(|source| ArchiveError::Open { path: path.to_path_buf(), source })?;
        let decoder = format
            .decoder(file)
            .map_err(|source| ArchiveError::Decode { path: path.to_path_buf(), line: 0, source })?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(decoder).lines(),
            lines_read: 0,
            failed: false,
        })
    }

    pub fn lines_read(&self) -> usize {
        self.lines_read
    }
}

impl Iterator for ArchiveReader {
    type Item = Result<String, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.lines.next()? {
            Ok(line) => {
                self.lines_read += 1;
                Some(Ok(line))
            }
            Err(source) => {
                self.failed = true;
                Some(Err(ArchiveError::Decode { path: self.path.clone(), line: self.lines_read, source }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_zst(path: &Path, body: &str) {
        let bytes = zstd::encode_all(body.as_bytes(), 0).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn reads_zstd_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.zst");
        write_zst(&path, "one\ntwo\n\nthree");

        let reader = ArchiveReader::open(&path, ArchiveFormat::Zstd).unwrap();
        let lines: Vec<String> = reader.map(Result::unwrap).collect();
        assert_eq!(lines, vec!["one", "two", "", "three"]);
    }

    #[test]
    fn reads_gzip_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jsonl.gz");
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(b"{\"a\":1}\n{\"a\":2}\n").unwrap();
        enc.finish().unwrap();

        let mut reader = ArchiveReader::open(&path, ArchiveFormat::Gzip).unwrap();
        assert_eq!(reader.next().unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(reader.next().unwrap().unwrap(), "{\"a\":2}");
        assert!(reader.next().is_none());
        assert_eq!(reader.lines_read(), 2);
    }

    #[test]
    fn reads_every_gzip_member() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("concat.jsonl.gz");
        let mut bytes = Vec::new();
        for body in [&b"{\"id\":1}\n"[..], &b"{\"id\":2}\n"[..]] {
            let mut enc = GzEncoder::new(Vec::new(), Compression::default());
            enc.write_all(body).unwrap();
            bytes.extend(enc.finish().unwrap());
        }
        std::fs::write(&path, bytes).unwrap();

        let lines: Vec<String> = ArchiveReader::open(&path, ArchiveFormat::Gzip).unwrap().map(Result::unwrap).collect();
        assert_eq!(lines, vec!["{\"id\":1}", "{\"id\":2}"]);
    }

    #[test]
    fn missing_file_is_open_error() {
        let dir = tempdir().unwrap();
        let err = ArchiveReader::open(&dir.path().join("gone.zst"), ArchiveFormat::Zstd).err().unwrap();
        assert!(matches!(err, ArchiveError::Open { .. }));
    }

    #[test]
    fn corrupt_stream_is_decode_error_then_stops() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.zst");
        std::fs::write(&path, b"definitely not zstd data").unwrap();

        let mut reader = ArchiveReader::open(&path, ArchiveFormat::Zstd).unwrap();
        assert!(matches!(reader.next(), Some(Err(ArchiveError::Decode { .. }))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn invalid_utf8_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.zst");
        let bytes = zstd::encode_all(&b"ok\n\xff\xfe\n"[..], 0).unwrap();
        std::fs::write(&path, bytes).unwrap();

        let results: Vec<_> = ArchiveReader::open(&path, ArchiveFormat::Zstd).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(ArchiveError::Decode { line: 1, .. })));
    }

    #[test]
    fn suffix_matching() {
        assert!(ArchiveFormat::Zstd.matches(Path::new("/x/RS_2020-01.zst")));
        assert!(!ArchiveFormat::Zstd.matches(Path::new("/x/fic_list.jsonl")));
        assert!(ArchiveFormat::Zstd.matches(Path::new("/x/.zst")));
        assert!(ArchiveFormat::Gzip.matches(Path::new("part-0001.jsonl.gz")));
        assert!(!ArchiveFormat::Gzip.matches(Path::new("part-0001.gz")));
        assert_eq!("GZ".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Gzip);
        assert!("bz2".parse::<ArchiveFormat>().is_err());
    }
}
