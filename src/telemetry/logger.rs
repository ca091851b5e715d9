//! # Sample Logger
//!
//! Append-only JSONL log of every accepted navigation sample, for
//! post-flight analysis and durable downstream consumption.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::oem4::protocol::NavigationSample;

/// One persisted line: wall-clock receive time plus the sample fields
#[derive(Serialize)]
struct SampleRecord<'a> {
    received_at: String,
    #[serde(flatten)]
    sample: &'a NavigationSample,
}

/// Rotating JSONL writer for navigation samples
///
/// Each record is flushed as it is written so a crash loses at most the
/// line being formatted. Rotation keeps files bounded and prunes the oldest
/// beyond the retention count.
pub struct SampleLogger {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: BufWriter<File>,
    records_in_file: usize,
    file_sequence: u64,
}

impl SampleLogger {
    /// Create the log directory (if needed) and open the first log file
    ///
    /// # Arguments
    ///
    /// * `log_dir` - Directory the JSONL files live in
    /// * `max_records_per_file` - Rotation threshold
    /// * `max_files_to_keep` - Retention count; older files are deleted
    ///
    /// # Errors
    ///
    /// Returns error if the directory or the first file cannot be created
    pub fn create(
        log_dir: impl Into<PathBuf>,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        let log_dir = log_dir.into();
        fs::create_dir_all(&log_dir)?;

        let file_sequence = 0;
        let writer = open_log_file(&log_dir, file_sequence)?;
        info!("Sample log directory: {}", log_dir.display());

        Ok(Self {
            log_dir,
            max_records_per_file,
            max_files_to_keep,
            writer,
            records_in_file: 0,
            file_sequence,
        })
    }

    /// Append one sample to the log
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be serialized or written; callers
    /// treat persistence failures as non-fatal.
    pub fn persist(&mut self, sample: &NavigationSample) -> Result<()> {
        let record = SampleRecord {
            received_at: Utc::now().to_rfc3339(),
            sample,
        };

        let line = serde_json::to_string(&record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;

        self.records_in_file += 1;
        if self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        Ok(())
    }

    /// Start a new log file and prune the oldest beyond the retention count
    fn rotate(&mut self) -> Result<()> {
        self.file_sequence += 1;
        self.writer = open_log_file(&self.log_dir, self.file_sequence)?;
        self.records_in_file = 0;
        debug!("Rotated sample log (sequence {})", self.file_sequence);

        let mut logs: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().map(|ext| ext == "jsonl").unwrap_or(false)
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .map(|name| name.starts_with("nav-"))
                        .unwrap_or(false)
            })
            .collect();
        logs.sort();

        while logs.len() > self.max_files_to_keep {
            let oldest = logs.remove(0);
            debug!("Pruning old sample log: {}", oldest.display());
            fs::remove_file(oldest)?;
        }

        Ok(())
    }
}

/// Open a fresh log file named by start time and rotation sequence
fn open_log_file(log_dir: &std::path::Path, sequence: u64) -> Result<BufWriter<File>> {
    let name = format!(
        "nav-{}-{:04}.jsonl",
        Utc::now().format("%Y%m%d-%H%M%S"),
        sequence
    );
    let file = File::create(log_dir.join(name))?;
    Ok(BufWriter::new(file))
}
