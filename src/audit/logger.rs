//! Decision log writer, append-only JSONL files.
//!
//! Allowed URLs get logged too, not just blocked ones: the full request
//! surface of a page is the interesting output. One JSON object per line,
//! `~/.pagewarden/logs/{session_id}.jsonl`, flushed after every write so a
//! crashed scan still leaves a usable log.

use crate::audit::types::DecisionRecord;
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only decision logger that writes JSONL files.
pub struct DecisionLogger {
    log_path: PathBuf,
    /// Open file handle (kept open for the session lifetime)
    file: File,
    record_count: usize,
}

impl DecisionLogger {
    /// Create a logger for a session in the default log directory.
    /// Creates the directory and file if they don't exist.
    pub fn new(session_id: &str) -> Result<Self> {
        Self::in_dir(Self::log_directory()?, session_id)
    }

    /// Create a logger for a session in a specific directory
    /// (the config's `log_dir`).
    pub fn in_dir(dir: impl AsRef<Path>, session_id: &str) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
        Self::with_path(dir.join(format!("{}.jsonl", session_id)))
    }

    /// Create a logger writing to a specific file path (for testing).
    pub fn with_path(path: impl AsRef<Path>) -> Result<Self> {
        let log_path = path.as_ref().to_path_buf();
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

        Ok(Self {
            log_path,
            file,
            record_count: 0,
        })
    }

    /// Log a decision. Serializes to JSON and appends to the file.
    /// Flushes immediately.
    pub fn log(&mut self, record: &DecisionRecord) -> Result<()> {
        let json = serde_json::to_string(record).context("Failed to serialize decision record")?;
        writeln!(self.file, "{}", json).context("Failed to write decision record")?;
        self.file.flush().context("Failed to flush decision log")?;
        self.record_count += 1;
        Ok(())
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Number of records written this session.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Default log directory (~/.pagewarden/logs/).
    pub fn log_directory() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".pagewarden").join("logs"))
    }
}
