//! Command-line interface module for the organizer.
//!
//! This module handles:
//! - One-shot scans of the target directory
//! - Watch mode
//! - Undo of the recorded history
//! - Loading configuration and reporting results

use crate::config::OrganizerConfig;
use crate::organizer::OrganizerEngine;
use crate::output::OutputFormatter;
use crate::undo::UndoManager;
use crate::watch::watch_directory;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeCommand {
    /// Organize every file currently in the directory.
    Organize {
        /// If true, simulate the operation without making changes.
        dry_run: bool,
    },
    /// Keep running and organize files as they are created.
    Watch { dry_run: bool },
    /// Undo every recorded move.
    Undo { dry_run: bool },
}

/// Runs the CLI application with the given command and directory path.
///
/// # Examples
///
/// ```no_run
/// use smart_organizer::cli::{run_cli, OrganizeCommand};
/// use std::path::Path;
///
/// let result = run_cli(OrganizeCommand::Organize { dry_run: true }, Path::new("/path/to/directory"));
/// if let Err(e) = result {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(command: OrganizeCommand, dir_path: &Path) -> Result<(), String> {
    run_cli_with_config(command, dir_path, None)
}

/// Runs the CLI application with an optional configuration file.
pub fn run_cli_with_config(
    command: OrganizeCommand,
    dir_path: &Path,
    config_path: Option<&Path>,
) -> Result<(), String> {
    match command {
        OrganizeCommand::Organize { dry_run } => {
            organize_directory_with_config(dir_path, config_path, dry_run)
        }
        OrganizeCommand::Watch { dry_run } => {
            let stop = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&stop);
            ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
                .map_err(|e| format!("Could not install interrupt handler: {}", e))?;
            watch_directory_with_config(dir_path, config_path, dry_run, &stop)
        }
        OrganizeCommand::Undo { dry_run } => undo_organization(dir_path, dry_run),
    }
}

/// Builds an engine for `base_path` with the filters from the configuration.
fn build_engine(
    base_path: &Path,
    config_path: Option<&Path>,
    dry_run: bool,
) -> Result<(OrganizerEngine, OrganizerConfig), String> {
    let engine = OrganizerEngine::new(base_path, dry_run).map_err(|e| e.to_string())?;

    let config = OrganizerConfig::load(config_path, engine.root())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    let filters = config
        .compile_filters()
        .map_err(|e| format!("Error compiling filters: {}", e))?;

    Ok((engine.with_filters(filters), config))
}

/// Organizes every regular file directly inside `base_path`.
///
/// Files are processed one at a time in name order. A failure on one file
/// is reported and the scan moves on to the next.
pub fn organize_directory_with_config(
    base_path: &Path,
    config_path: Option<&Path>,
    dry_run: bool,
) -> Result<(), String> {
    let (mut engine, _) = build_engine(base_path, config_path, dry_run)?;

    if dry_run {
        OutputFormatter::dry_run_notice("No files will be moved.");
    }
    OutputFormatter::info(&format!("Scanning: {}...", engine.root().display()));

    let files = list_files(engine.root())?;
    if files.is_empty() {
        OutputFormatter::plain("No files found to organize.");
        return Ok(());
    }

    let pb = OutputFormatter::create_progress_bar(files.len() as u64);
    let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut organized = 0;
    let mut failed = 0;

    for path in &files {
        match pb.suspend(|| engine.process_file(path)) {
            Ok(outcome) => {
                if let Some(folder) = outcome.folder() {
                    *category_counts.entry(folder.to_string()).or_insert(0) += 1;
                    organized += 1;
                }
            }
            Err(e) => {
                pb.suspend(|| OutputFormatter::error(&e.to_string()));
                failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if organized > 0 {
        OutputFormatter::summary_table(&category_counts, organized);
    }

    if failed > 0 {
        OutputFormatter::warning(&format!(
            "{} file(s) could not be organized. Please review errors above.",
            failed
        ));
    }

    if dry_run {
        OutputFormatter::dry_run_notice("Dry run complete. No files were modified.");
    } else if organized > 0 {
        OutputFormatter::plain(&format!(
            "History saved. Use 'organize --path {} --undo' to revert changes.",
            engine.root().display()
        ));
    }
    OutputFormatter::plain("Done.");

    Ok(())
}

/// Watches `base_path` for new files until `stop` is set.
pub fn watch_directory_with_config(
    base_path: &Path,
    config_path: Option<&Path>,
    dry_run: bool,
    stop: &AtomicBool,
) -> Result<(), String> {
    let (mut engine, config) = build_engine(base_path, config_path, dry_run)?;

    OutputFormatter::info(&format!("Started watching: {}", engine.root().display()));
    OutputFormatter::plain("Press Ctrl+C to stop.");

    let handled = watch_directory(&mut engine, config.watch.settle_delay(), stop)
        .map_err(|e| e.to_string())?;

    OutputFormatter::info(&format!("Stopped watching. {} file(s) handled.", handled));
    Ok(())
}

/// Undoes the previous organization and prints what happened.
fn undo_organization(base_path: &Path, dry_run: bool) -> Result<(), String> {
    OutputFormatter::info("Undoing previous organization...");

    let Some(report) = UndoManager::undo(base_path, dry_run).map_err(|e| e.to_string())? else {
        return Ok(());
    };

    OutputFormatter::success("Undo complete!");
    OutputFormatter::plain(&format!("  Restored: {}", report.restored_files));

    if !report.skipped_files.is_empty() {
        OutputFormatter::plain(&format!("  Skipped: {}", report.skipped_files.len()));
        for (path, reason) in &report.skipped_files {
            OutputFormatter::plain(&format!("    - {}: {}", path.display(), reason));
        }
    }

    if !report.failed_restores.is_empty() {
        OutputFormatter::plain(&format!("  Failed: {}", report.failed_restores.len()));
        for (path, reason) in &report.failed_restores {
            OutputFormatter::error(&format!("    - {}: {}", path.display(), reason));
        }
    }

    if !report.removed_folders.is_empty() {
        OutputFormatter::plain(&format!(
            "  Removed empty folders: {}",
            report.removed_folders.len()
        ));
    }

    if dry_run {
        OutputFormatter::dry_run_notice("No files were restored and history was kept.");
    }

    Ok(())
}

/// Lists the regular files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let entries = fs::read_dir(dir)
        .map_err(|e| format!("Error reading directory {}: {}", dir.display(), e))?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_files_skips_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("b.txt"), "b").unwrap();
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(temp_dir.path().join("folder")).unwrap();

        let files = list_files(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_watch_returns_when_already_stopped() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let stop = AtomicBool::new(true);

        let result = watch_directory_with_config(temp_dir.path(), None, false, &stop);
        assert!(result.is_ok());
    }

    #[test]
    fn test_watch_rejects_missing_directory() {
        let stop = AtomicBool::new(true);
        let result =
            watch_directory_with_config(Path::new("/non/existent/path"), None, false, &stop);
        assert!(result.is_err());
    }
}
