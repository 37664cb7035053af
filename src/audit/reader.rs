//! Decision log reader: filter and display session logs.
//!
//! Reads JSONL log files and provides filtering, summarization, and
//! pretty-printing for the `pagewarden log` command.

use crate::audit::types::*;
use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads and queries decision log files.
pub struct DecisionReader {
    log_dir: PathBuf,
}

impl DecisionReader {
    /// Create a reader using the default log directory.
    pub fn new() -> Result<Self> {
        let log_dir = crate::audit::logger::DecisionLogger::log_directory()?;
        Ok(Self { log_dir })
    }

    /// Create a reader for a specific directory (the config's `log_dir`,
    /// or a temp directory in tests).
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            log_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Read all records from a session log file.
    pub fn read_session(&self, session_id: &str) -> Result<Vec<DecisionRecord>> {
        let path = self.log_dir.join(format!("{}.jsonl", session_id));
        self.read_file(&path)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<DecisionRecord>> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read log file: {}", path.display()))?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Failed to parse decision record at line {}", i + 1))
            })
            .collect()
    }

    /// Read records from the most recent session.
    pub fn read_latest_session(&self) -> Result<Vec<DecisionRecord>> {
        match self.find_latest_session()? {
            Some(path) => self.read_file(&path),
            None => Ok(Vec::new()),
        }
    }

    /// Find the most recently written session log file.
    fn find_latest_session(&self) -> Result<Option<PathBuf>> {
        if !self.log_dir.exists() {
            return Ok(None);
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |e| e == "jsonl"))
            .collect();

        // Sort by modification time, most recent first
        entries.sort_by(|a, b| {
            let a_time = fs::metadata(a).and_then(|m| m.modified()).ok();
            let b_time = fs::metadata(b).and_then(|m| m.modified()).ok();
            b_time.cmp(&a_time)
        });

        Ok(entries.into_iter().next())
    }

    /// List all available session IDs.
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        if !self.log_dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions: Vec<String> = fs::read_dir(&self.log_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "jsonl"))
            .filter_map(|e| {
                e.path()
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
            })
            .collect();

        sessions.sort();
        Ok(sessions)
    }

    /// Filter records based on criteria.
    pub fn filter_records(records: &[DecisionRecord], filter: &LogFilter) -> Vec<DecisionRecord> {
        records
            .iter()
            .filter(|r| {
                if let Some(ref session) = filter.session_id {
                    if r.session_id != *session {
                        return false;
                    }
                }
                if let Some(phase) = filter.phase {
                    if r.phase != phase {
                        return false;
                    }
                }
                if let Some(ref outcome_filter) = filter.outcome {
                    match outcome_filter {
                        OutcomeFilter::Allowed => {
                            if !r.outcome.is_allowed() {
                                return false;
                            }
                        }
                        OutcomeFilter::Blocked => {
                            if !r.outcome.is_blocked() {
                                return false;
                            }
                        }
                    }
                }
                true
            })
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Generate a summary for a set of records.
    pub fn summarize(records: &[DecisionRecord]) -> SessionSummary {
        let mut summary = SessionSummary::default();

        if let Some(first) = records.first() {
            summary.session_id = first.session_id.clone();
            summary.command = first.command.clone();
            summary.start_time = Some(first.timestamp);
        }
        if let Some(last) = records.last() {
            summary.end_time = Some(last.timestamp);
        }

        summary.total_checks = records.len();
        let mut hosts = HashSet::new();
        for record in records {
            match &record.outcome {
                Outcome::Allowed => summary.allowed += 1,
                Outcome::Blocked { .. } => summary.blocked += 1,
            }
            if let Some(hostname) = &record.hostname {
                hosts.insert(hostname.clone());
            }
        }
        summary.unique_hosts = hosts.len();

        summary
    }

    /// Pretty-print a record for terminal display.
    pub fn format_record(record: &DecisionRecord) -> String {
        let timestamp = record.timestamp.format("%H:%M:%S").to_string();
        let outcome_str = match &record.outcome {
            Outcome::Allowed => "ALLOWED".green().to_string(),
            Outcome::Blocked { .. } => "BLOCKED".red().to_string(),
        };

        let phase = format!("{}", record.phase);
        let mut line = format!(
            "[{}] {} {} {}",
            timestamp.dimmed(),
            outcome_str,
            phase.bold(),
            record.url
        );

        if let Outcome::Blocked { reason, .. } = &record.outcome {
            line.push_str(&format!(" ({})", reason.dimmed()));
        }

        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::logger::DecisionLogger;
    use crate::guard::GuardError;
    use tempfile::TempDir;

    fn write_session(dir: &Path, session_id: &str) {
        let mut logger = DecisionLogger::in_dir(dir, session_id).unwrap();
        logger
            .log(&DecisionRecord::allowed(
                session_id,
                "audit",
                CheckPhase::Navigation,
                "https://example.com/",
                Some("example.com".to_string()),
            ))
            .unwrap();
        logger
            .log(&DecisionRecord::allowed(
                session_id,
                "audit",
                CheckPhase::Subresource,
                "https://cdn.example.com/app.js",
                Some("cdn.example.com".to_string()),
            ))
            .unwrap();
        logger
            .log(&DecisionRecord::blocked(
                session_id,
                "audit",
                CheckPhase::Subresource,
                "http://169.254.169.254/latest/meta-data/",
                Some("169.254.169.254".to_string()),
                &GuardError::blocked_address("169.254.169.254", "169.254.169.254".parse().unwrap()),
            ))
            .unwrap();
    }

    #[test]
    fn test_read_and_summarize_session() {
        let tmp = TempDir::new().unwrap();
        write_session(tmp.path(), "s1");

        let reader = DecisionReader::with_dir(tmp.path());
        let records = reader.read_session("s1").unwrap();
        assert_eq!(records.len(), 3);

        let summary = DecisionReader::summarize(&records);
        assert_eq!(summary.total_checks, 3);
        assert_eq!(summary.allowed, 2);
        assert_eq!(summary.blocked, 1);
        assert_eq!(summary.unique_hosts, 3);
        assert_eq!(summary.command, "audit");
    }

    #[test]
    fn test_filter_by_outcome() {
        let tmp = TempDir::new().unwrap();
        write_session(tmp.path(), "s1");

        let reader = DecisionReader::with_dir(tmp.path());
        let records = reader.read_session("s1").unwrap();

        let blocked = DecisionReader::filter_records(
            &records,
            &LogFilter {
                outcome: Some(OutcomeFilter::Blocked),
                ..Default::default()
            },
        );
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].url, "http://169.254.169.254/latest/meta-data/");
    }

    #[test]
    fn test_filter_by_phase_and_limit() {
        let tmp = TempDir::new().unwrap();
        write_session(tmp.path(), "s1");

        let reader = DecisionReader::with_dir(tmp.path());
        let records = reader.read_session("s1").unwrap();

        let subresources = DecisionReader::filter_records(
            &records,
            &LogFilter {
                phase: Some(CheckPhase::Subresource),
                limit: Some(1),
                ..Default::default()
            },
        );
        assert_eq!(subresources.len(), 1);
        assert_eq!(subresources[0].phase, CheckPhase::Subresource);
    }

    #[test]
    fn test_list_sessions_sorted() {
        let tmp = TempDir::new().unwrap();
        write_session(tmp.path(), "b-session");
        write_session(tmp.path(), "a-session");

        let reader = DecisionReader::with_dir(tmp.path());
        let sessions = reader.list_sessions().unwrap();
        assert_eq!(sessions, vec!["a-session", "b-session"]);
    }

    #[test]
    fn test_empty_directory_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let reader = DecisionReader::with_dir(tmp.path().join("missing"));
        assert!(reader.read_latest_session().unwrap().is_empty());
        assert!(reader.list_sessions().unwrap().is_empty());
    }
}
