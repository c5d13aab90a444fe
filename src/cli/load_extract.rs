use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder, Trim, WriterBuilder};
use thiserror::Error;

use crate::primitives::io::FileIo;
use crate::storage::btree::BTree;
use crate::types::IndexError;

/// Error type for CLI load/extract operations.
#[derive(Error, Debug)]
pub enum CliError {
    /// Generic error message.
    #[error("{0}")]
    Message(String),
    /// IO error from file operations.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// CSV reading or writing error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// Index layer error.
    #[error(transparent)]
    Index(#[from] IndexError),
}

impl From<&str> for CliError {
    fn from(value: &str) -> Self {
        CliError::Message(value.to_string())
    }
}

impl From<String> for CliError {
    fn from(value: String) -> Self {
        CliError::Message(value)
    }
}

/// Why a line of a load file was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadIssueKind {
    /// The line is not a `key,value` pair of unsigned decimal integers.
    Malformed(String),
    /// The key is already present in the index.
    Duplicate(u64),
}

/// A skipped line of a load file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadIssue {
    /// 1-based line number in the source.
    pub line: u64,
    /// What was wrong with it.
    pub kind: LoadIssueKind,
}

impl fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LoadIssueKind::Malformed(reason) => {
                write!(f, "line {}: invalid line format ({reason})", self.line)
            }
            LoadIssueKind::Duplicate(key) => {
                write!(f, "line {}: key {key} already exists, skipping", self.line)
            }
        }
    }
}

/// Outcome of a bulk load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Number of pairs inserted.
    pub inserted: u64,
    /// Number of lines skipped because their key was already present.
    pub duplicates: u64,
    /// Number of lines skipped because they could not be parsed.
    pub malformed: u64,
    /// Every skipped line, in source order.
    pub issues: Vec<LoadIssue>,
}

impl LoadReport {
    fn skip(&mut self, line: u64, kind: LoadIssueKind) {
        match &kind {
            LoadIssueKind::Malformed(reason) => {
                self.malformed += 1;
                tracing::warn!(
                    target: "blockdex::load",
                    line,
                    reason = %reason,
                    "skipping malformed line"
                );
            }
            LoadIssueKind::Duplicate(key) => {
                self.duplicates += 1;
                tracing::warn!(target: "blockdex::load", line, key, "skipping duplicate key");
            }
        }
        self.issues.push(LoadIssue { line, kind });
    }
}

/// Inserts every `key,value` line read from `reader`.
///
/// Blank lines are ignored. Malformed lines and duplicate keys are recorded
/// in the report under their 1-based line number and skipped; storage
/// failures abort the load.
pub fn load_pairs<F: FileIo, R: BufRead>(
    tree: &mut BTree<F>,
    reader: R,
) -> Result<LoadReport, CliError> {
    let mut report = LoadReport::default();

    for (idx, raw) in reader.split(b'\n').enumerate() {
        let raw = raw?;
        let line = idx as u64 + 1;
        let text = raw.strip_suffix(b"\r").unwrap_or(&raw[..]);
        if text.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let (key, value) = match parse_line(text) {
            Ok(pair) => pair,
            Err(reason) => {
                report.skip(line, LoadIssueKind::Malformed(reason));
                continue;
            }
        };
        match tree.insert(key, value) {
            Ok(()) => report.inserted += 1,
            Err(err) if err.is_recoverable() => {
                report.skip(line, LoadIssueKind::Duplicate(key));
            }
            Err(err) => return Err(err.into()),
        }
    }

    tracing::info!(
        target: "blockdex::load",
        inserted = report.inserted,
        duplicates = report.duplicates,
        malformed = report.malformed,
        "load finished"
    );
    Ok(report)
}

/// Opens `path` and loads it with [`load_pairs`].
pub fn load_file<F: FileIo>(tree: &mut BTree<F>, path: &Path) -> Result<LoadReport, CliError> {
    let file = File::open(path).map_err(|err| {
        CliError::Message(format!("unable to open {} for load: {err}", path.display()))
    })?;
    load_pairs(tree, BufReader::new(file))
}

fn parse_line(text: &[u8]) -> Result<(u64, u64), String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text);
    let mut record = ByteRecord::new();
    match reader.read_byte_record(&mut record) {
        Ok(true) => parse_pair(&record),
        Ok(false) => Err("empty record".to_string()),
        Err(err) => Err(err.to_string()),
    }
}

fn parse_pair(record: &ByteRecord) -> Result<(u64, u64), String> {
    if record.len() != 2 {
        return Err(format!("expected 2 fields, found {}", record.len()));
    }
    Ok((parse_u64(&record[0])?, parse_u64(&record[1])?))
}

fn parse_u64(field: &[u8]) -> Result<u64, String> {
    let text = std::str::from_utf8(field).map_err(|_| "field is not valid UTF-8".to_string())?;
    text.parse::<u64>()
        .map_err(|_| format!("invalid integer '{text}'"))
}

/// Writes every entry as a `key,value` line in ascending key order and
/// returns the number of lines written.
pub fn extract_pairs<F: FileIo, W: Write>(tree: &BTree<F>, writer: W) -> Result<u64, CliError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    let mut written = 0u64;
    for entry in tree.iter() {
        let (key, value) = entry?;
        writer.write_record([key.to_string(), value.to_string()])?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Extracts into the file at `path`, refusing to replace an existing file
/// unless `overwrite` is set.
pub fn extract_file<F: FileIo>(
    tree: &BTree<F>,
    path: &Path,
    overwrite: bool,
) -> Result<u64, CliError> {
    if path.exists() && !overwrite {
        return Err(CliError::Message(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    let file = File::create(path)?;
    let written = extract_pairs(tree, BufWriter::new(file))?;
    tracing::info!(
        target: "blockdex::extract",
        path = %path.display(),
        written,
        "extract finished"
    );
    Ok(written)
}

/// Writes every entry as a `key value` line in ascending key order.
pub fn print_pairs<F: FileIo, W: Write>(tree: &BTree<F>, mut out: W) -> Result<u64, CliError> {
    let mut printed = 0u64;
    for entry in tree.iter() {
        let (key, value) = entry?;
        writeln!(out, "{key} {value}")?;
        printed += 1;
    }
    out.flush()?;
    Ok(printed)
}
