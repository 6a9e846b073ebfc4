//! Persistent record of executed moves, consumed by undo.
//!
//! The ledger is a pretty-printed JSON array stored at
//! `<root>/.organizer_history.json`. Each element is
//! `{"src": ..., "dst": ..., "timestamp": <epoch seconds>}`.
//! It is rewritten in full on every append. Undo deletes it once every
//! record has been dealt with, or keeps only the moves it could not reverse.

use crate::error::{OrganizeError, OrganizeResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the ledger file inside the organized directory.
pub const HISTORY_FILE_NAME: &str = ".organizer_history.json";

/// A single executed move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Where the file was before the move.
    pub src: PathBuf,
    /// Where the file was moved to.
    pub dst: PathBuf,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

impl MoveRecord {
    /// Creates a record stamped with the current time.
    pub fn new(src: impl Into<PathBuf>, dst: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            src: src.into(),
            dst: dst.into(),
            timestamp: now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1e6,
        }
    }
}

/// Handle to the on-disk move history.
///
/// In simulation mode the ledger never touches the filesystem on write.
#[derive(Debug, Clone)]
pub struct HistoryLedger {
    path: PathBuf,
    dry_run: bool,
}

impl HistoryLedger {
    /// Opens the ledger belonging to `root`.
    pub fn for_root(root: &Path, dry_run: bool) -> Self {
        Self::at(root.join(HISTORY_FILE_NAME), dry_run)
    }

    /// Opens a ledger stored at an explicit path.
    pub fn at(path: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            path: path.into(),
            dry_run,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Returns all recorded moves in chronological order.
    ///
    /// A missing, unreadable or malformed ledger yields an empty history.
    pub fn read_all(&self) -> Vec<MoveRecord> {
        match self.try_read() {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable history");
                Vec::new()
            }
        }
    }

    fn try_read(&self) -> Result<Vec<MoveRecord>, Box<dyn std::error::Error>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Appends a record and rewrites the ledger. No-op in simulation mode.
    pub fn append(&self, record: MoveRecord) -> OrganizeResult<()> {
        if self.dry_run {
            return Ok(());
        }

        let mut records = self.read_all();
        records.push(record);
        self.write_all(&records)
    }

    /// Writes the full list to a sibling temp file, then renames it into place.
    fn write_all(&self, records: &[MoveRecord]) -> OrganizeResult<()> {
        let json = serde_json::to_string_pretty(records).map_err(|e| {
            OrganizeError::HistoryWriteFailed {
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            }
        })?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, json).map_err(|e| OrganizeError::HistoryWriteFailed { source: e })?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            OrganizeError::HistoryWriteFailed { source: e }
        })
    }

    /// Replaces the whole history with `records`. No-op in simulation mode.
    ///
    /// An empty list deletes the file.
    pub fn replace(&self, records: &[MoveRecord]) -> OrganizeResult<()> {
        if self.dry_run {
            return Ok(());
        }
        if records.is_empty() {
            return self.clear();
        }
        self.write_all(records)
    }

    /// Deletes the ledger file. No-op in simulation mode or when absent.
    pub fn clear(&self) -> OrganizeResult<()> {
        if self.dry_run || !self.path.exists() {
            return Ok(());
        }
        fs::remove_file(&self.path).map_err(|e| OrganizeError::HistoryWriteFailed { source: e })
    }
}
