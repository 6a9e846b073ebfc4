//! Undo for organization runs.
//!
//! Replays the history ledger newest-first, moving every file back to where
//! it came from and pruning folders left empty.

use crate::error::OrganizeResult;
use crate::history::{HistoryLedger, MoveRecord};
use crate::organizer::{relocate, resolve_root};
use crate::output::OutputFormatter;
use std::fs;
use std::path::{Path, PathBuf};

/// Represents the result of an undo pass.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// Number of files moved back (or that would be, in dry-run mode).
    pub restored_files: usize,
    /// Records whose destination no longer exists.
    pub skipped_files: Vec<(PathBuf, String)>,
    /// Records that could not be restored.
    pub failed_restores: Vec<(PathBuf, String)>,
    /// Folders removed because the undo left them empty.
    pub removed_folders: Vec<PathBuf>,
    /// Files that were in the way and got renamed aside.
    pub backups: Vec<PathBuf>,
}

impl UndoReport {
    /// Returns the total number of records processed.
    pub fn total_processed(&self) -> usize {
        self.restored_files + self.failed_restores.len() + self.skipped_files.len()
    }

    /// Returns true if every record was restored.
    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

/// Reverses recorded moves.
pub struct UndoManager;

impl UndoManager {
    /// Undoes every move recorded in the ledger of `base_path`.
    ///
    /// Returns `Ok(None)` when there is no history to undo. A record whose
    /// destination is gone is reported and skipped; the rest of the batch
    /// still runs. After a full pass the ledger is deleted, even if some
    /// records were skipped. Records whose restore failed are kept so a later
    /// undo can retry them. With `dry_run` nothing on disk changes.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use smart_organizer::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// match UndoManager::undo(Path::new("/path/to/directory"), false) {
    ///     Ok(Some(report)) => println!("Restored {} files", report.restored_files),
    ///     Ok(None) => println!("Nothing to undo"),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(base_path: &Path, dry_run: bool) -> OrganizeResult<Option<UndoReport>> {
        let root = resolve_root(base_path)?;
        Self::undo_ledger(&HistoryLedger::for_root(&root, dry_run))
    }

    /// Undoes every move recorded in `ledger`.
    pub fn undo_ledger(ledger: &HistoryLedger) -> OrganizeResult<Option<UndoReport>> {
        if !ledger.exists() {
            OutputFormatter::info("No history found.");
            return Ok(None);
        }

        let history = ledger.read_all();
        if history.is_empty() {
            OutputFormatter::info("History is empty.");
            return Ok(None);
        }

        let dry_run = ledger.is_dry_run();
        OutputFormatter::header(&format!("--- Undoing {} operations ---", history.len()));

        let mut report = UndoReport::default();
        let mut pending = Vec::new();
        for record in history.iter().rev() {
            if !Self::restore_record(record, dry_run, &mut report) {
                pending.push(record.clone());
            }
        }

        // Moves that could not be reversed stay recorded, oldest first
        pending.reverse();
        if let Err(e) = ledger.replace(&pending) {
            OutputFormatter::warning(&format!("Could not update history file: {}", e));
        } else if !pending.is_empty() {
            OutputFormatter::warning(&format!(
                "{} operation(s) kept in history for a later undo.",
                pending.len()
            ));
        }

        Ok(Some(report))
    }

    /// Restores one record. Returns false when the file is still at its
    /// destination and the record must stay in the ledger.
    fn restore_record(record: &MoveRecord, dry_run: bool, report: &mut UndoReport) -> bool {
        if !record.dst.exists() {
            OutputFormatter::warning(&format!(
                "File {} not found. Cannot restore.",
                record.dst.display()
            ));
            report.skipped_files.push((
                record.dst.clone(),
                "File not found at expected location".to_string(),
            ));
            return true;
        }

        let line = format!("Restoring: {} -> {}", file_name(&record.dst), file_name(&record.src));
        if dry_run {
            OutputFormatter::dry_run_notice(&line);
            report.restored_files += 1;
            return true;
        }
        OutputFormatter::plain(&line);

        if record.src.exists() {
            let backup_path = generate_backup_path(&record.src);
            if let Err(e) = fs::rename(&record.src, &backup_path) {
                OutputFormatter::error(&format!(
                    "Could not back up {}: {}",
                    record.src.display(),
                    e
                ));
                report.failed_restores.push((
                    record.src.clone(),
                    format!("Could not backup conflicting file: {}", e),
                ));
                return false;
            }
            OutputFormatter::warning(&format!(
                "{} was in the way, kept as {}",
                file_name(&record.src),
                file_name(&backup_path)
            ));
            report.backups.push(backup_path);
        }

        if let Err(e) = relocate(&record.dst, &record.src) {
            OutputFormatter::error(&e.to_string());
            report.failed_restores.push((record.dst.clone(), e.to_string()));
            return false;
        }
        report.restored_files += 1;

        // Never prune the directory the file was just restored into
        if let Some(parent) = record.dst.parent()
            && Some(parent) != record.src.parent()
            && remove_if_empty(parent)
        {
            report.removed_folders.push(parent.to_path_buf());
        }
        true
    }
}

/// Removes `dir` if it has no entries left. Failures are ignored.
fn remove_if_empty(dir: &Path) -> bool {
    let is_empty = fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    is_empty && fs::remove_dir(dir).is_ok()
}

/// Generates a free backup path for a file by appending a timestamp.
///
/// Example: `file.txt` becomes `file.txt.bak.20251109-143052`, then
/// `file.txt.bak.20251109-143052.1` if that is taken within the same second.
fn generate_backup_path(original_path: &Path) -> PathBuf {
    let mut backup_name = original_path.file_name().unwrap_or_default().to_os_string();
    backup_name.push(format!(".bak.{}", chrono::Local::now().format("%Y%m%d-%H%M%S")));
    let base = original_path.with_file_name(&backup_name);
    if !base.exists() {
        return base;
    }

    (1u32..)
        .map(|n| {
            let mut name = backup_name.clone();
            name.push(format!(".{}", n));
            original_path.with_file_name(name)
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or(base)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
