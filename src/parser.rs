//! Grid Engine accounting file reader.
//!
//! Each finished job or array task is one `:`-separated line of 45 fields.
//! The `category` field may itself contain `:` characters, so fields are
//! located from both ends of the line.

use crate::models::{JobRecord, UNKNOWN_OWNER};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

const FIELD_COUNT: usize = 45;
const CATEGORY_INDEX: usize = 39;
const FIELDS_AFTER_CATEGORY: usize = 5;

// Field positions before the category.
const QNAME: usize = 0;
const HOSTNAME: usize = 1;
const OWNER: usize = 3;
const JOB_NAME: usize = 4;
const JOB_NUMBER: usize = 5;
const START_TIME: usize = 9;
const END_TIME: usize = 10;
const RU_WALLCLOCK: usize = 13;
const PROJECT: usize = 31;
const SLOTS: usize = 34;
const TASK_NUMBER: usize = 35;

/// Counters for one pass over an accounting source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: usize,
    pub records: usize,
    pub skipped: usize,
}

/// Parse one accounting line. `None` for comments, blank lines and lines that
/// are not well-formed records.
pub fn parse_line(line: &str) -> Option<JobRecord> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() < FIELD_COUNT {
        return None;
    }
    let tail = fields.len() - FIELDS_AFTER_CATEGORY;
    let category = fields[CATEGORY_INDEX..tail].join(":");

    // Every field other than the category must be non-empty.
    if fields[..CATEGORY_INDEX]
        .iter()
        .chain(&fields[tail..])
        .any(|f| f.is_empty())
    {
        return None;
    }

    let hostname = fields[HOSTNAME].split('.').next().unwrap_or_default();

    Some(JobRecord {
        queue: fields[QNAME].to_string(),
        hostname: hostname.to_string(),
        user: fields[OWNER].to_string(),
        job_name: fields[JOB_NAME].to_string(),
        job_number: fields[JOB_NUMBER].parse().ok()?,
        task_number: fields[TASK_NUMBER].parse().ok()?,
        project: fields[PROJECT].to_string(),
        start_time: fields[START_TIME].parse().ok()?,
        end_time: fields[END_TIME].parse().ok()?,
        wallclock_seconds: fields[RU_WALLCLOCK].parse().ok()?,
        slot_count: fields[SLOTS].parse().ok().filter(|s: &u32| *s >= 1)?,
        category,
        equipment_owner: UNKNOWN_OWNER.to_string(),
    })
}

/// Streams [`JobRecord`]s out of any buffered reader.
pub struct AccountingReader<R> {
    source: String,
    reader: R,
    buf: Vec<u8>,
    stats: ParseStats,
    error: Option<std::io::Error>,
}

impl AccountingReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open accounting file: {}", path.display()))?;
        Ok(Self::new(path.display().to_string(), BufReader::new(file)))
    }
}

impl<R: BufRead> AccountingReader<R> {
    pub fn new(source: impl Into<String>, reader: R) -> Self {
        Self {
            source: source.into(),
            reader,
            buf: Vec::new(),
            stats: ParseStats::default(),
            error: None,
        }
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    /// The I/O error that ended iteration early, if any.
    pub fn take_error(&mut self) -> Option<std::io::Error> {
        self.error.take()
    }
}

impl<R: BufRead> Iterator for AccountingReader<R> {
    type Item = JobRecord;

    fn next(&mut self) -> Option<JobRecord> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    self.error = Some(e);
                    return None;
                }
            }
            self.stats.lines += 1;

            // Job names and paths are not guaranteed to be UTF-8.
            let Ok(line) = std::str::from_utf8(&self.buf) else {
                self.stats.skipped += 1;
                debug!(source = %self.source, line = self.stats.lines, "Skipping accounting line that is not valid UTF-8");
                continue;
            };

            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            match parse_line(line) {
                Some(record) => {
                    self.stats.records += 1;
                    return Some(record);
                }
                None => {
                    self.stats.skipped += 1;
                    debug!(source = %self.source, line = self.stats.lines, "Skipping malformed accounting line");
                }
            }
        }
    }
}

/// `$SGE_ROOT/$SGE_CELL/common/accounting`, if both variables are set.
pub fn default_accounting_file() -> Option<PathBuf> {
    let root = std::env::var_os("SGE_ROOT")?;
    let cell = std::env::var_os("SGE_CELL")?;
    Some(PathBuf::from(root).join(cell).join("common").join("accounting"))
}
