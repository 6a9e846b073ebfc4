//! The organizer engine.
//!
//! [`OrganizerEngine::process_file`] takes one file from the source directory
//! through classification, duplicate detection and renaming, then moves it
//! (or, in dry-run mode, only pretends to) and records the move in the
//! history ledger.

use crate::classifier::{Category, Classifier, FileDescriptor};
use crate::config::CompiledFilters;
use crate::error::{OrganizeError, OrganizeResult};
use crate::hasher::{self, Fingerprint};
use crate::history::{HistoryLedger, MoveRecord};
use crate::namer;
use crate::output::OutputFormatter;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Folder that receives content duplicates.
pub const DUPLICATES_DIR: &str = "Duplicates";

/// What happened to a single file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Directory, hidden file or excluded by the filters.
    Skipped,
    /// Renamed into its category folder.
    Moved {
        category: Category,
        destination: PathBuf,
    },
    /// Content-identical to `duplicate_of`, moved to the duplicates folder.
    Quarantined {
        category: Category,
        destination: PathBuf,
        duplicate_of: PathBuf,
    },
}

impl FileOutcome {
    pub fn destination(&self) -> Option<&Path> {
        match self {
            FileOutcome::Skipped => None,
            FileOutcome::Moved { destination, .. } | FileOutcome::Quarantined { destination, .. } => {
                Some(destination.as_path())
            }
        }
    }

    /// Name of the folder the file ended up in, for summaries.
    pub fn folder(&self) -> Option<&str> {
        match self {
            FileOutcome::Skipped => None,
            FileOutcome::Moved { category, .. } => Some(category.as_str()),
            FileOutcome::Quarantined { .. } => Some(DUPLICATES_DIR),
        }
    }
}

/// Classifies, deduplicates, renames and moves files within one directory.
///
/// In dry-run mode no folder is created, no file is moved and the ledger is
/// left alone; destinations chosen during the run are remembered so later
/// files in the same run never pick the same name.
///
/// ```no_run
/// use smart_organizer::organizer::OrganizerEngine;
/// use std::path::Path;
///
/// let mut engine = OrganizerEngine::new(Path::new("/home/me/Downloads"), false)?;
/// let outcome = engine.process_file(Path::new("/home/me/Downloads/My_Resume_2023.pdf"))?;
/// println!("{:?}", outcome.destination());
/// # Ok::<(), smart_organizer::OrganizeError>(())
/// ```
pub struct OrganizerEngine {
    root: PathBuf,
    dry_run: bool,
    classifier: Classifier,
    ledger: HistoryLedger,
    filters: Option<CompiledFilters>,
    simulated: HashSet<PathBuf>,
}

impl OrganizerEngine {
    /// Creates an engine for `root` with the built-in classification rules.
    ///
    /// Fails if `root` does not exist or is not a directory.
    pub fn new(root: &Path, dry_run: bool) -> OrganizeResult<Self> {
        let root = resolve_root(root)?;
        let ledger = HistoryLedger::for_root(&root, dry_run);

        Ok(Self {
            root,
            dry_run,
            classifier: Classifier::default(),
            ledger,
            filters: None,
            simulated: HashSet::new(),
        })
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_ledger(mut self, ledger: HistoryLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    /// Destinations claimed by simulated moves in this run.
    pub fn simulated_destinations(&self) -> &HashSet<PathBuf> {
        &self.simulated
    }

    /// Organizes a single file.
    ///
    /// Errors only concern this file: it vanished, its target folder could
    /// not be created, or the move itself failed.
    pub fn process_file(&mut self, path: &Path) -> OrganizeResult<FileOutcome> {
        let file = FileDescriptor::new(path);

        if file.is_hidden() || file.is_dir() {
            tracing::debug!(path = %path.display(), "skipping hidden file or directory");
            return Ok(FileOutcome::Skipped);
        }

        if let Some(filters) = &self.filters
            && !filters.should_include(Path::new(file.name()))
        {
            tracing::debug!(path = %path.display(), "excluded by filters");
            return Ok(FileOutcome::Skipped);
        }

        let created = file.created().map_err(|e| OrganizeError::InaccessibleFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let category = self.classifier.classify(&file);
        let category_dir = self.root.join(category.as_str());
        self.ensure_dir(&category_dir)?;

        let fingerprint = hasher::hash_file(path);
        tracing::debug!(file = file.name(), %category, %fingerprint, "classified");

        if let Some(existing) = self.find_duplicate(&category_dir, path, &fingerprint) {
            OutputFormatter::warning(&format!(
                "[DUPLICATE] {} is identical to {}",
                file.name(),
                display_name(&existing)
            ));

            let duplicates_dir = self.root.join(DUPLICATES_DIR);
            self.ensure_dir(&duplicates_dir)?;

            let name = namer::quarantine_name(file.os_name(), |c| {
                self.is_occupied(&duplicates_dir.join(c))
            });
            let destination = duplicates_dir.join(&name);
            self.execute_move(path, &destination)?;
            self.report(
                "Quarantined",
                &format!("{}/{}", DUPLICATES_DIR, name.to_string_lossy()),
            );

            return Ok(FileOutcome::Quarantined {
                category,
                destination,
                duplicate_of: existing,
            });
        }

        let date = created.date_naive();
        let name = namer::standard_name(&category, date, file.os_extension(), |c| {
            self.is_occupied(&category_dir.join(c))
        });
        let destination = category_dir.join(&name);
        self.execute_move(path, &destination)?;
        self.report("Moved", &format!("{}/{}", category, name.to_string_lossy()));

        Ok(FileOutcome::Moved {
            category,
            destination,
        })
    }

    /// Creates `dir` if it is missing. Never touches the disk in dry-run mode.
    fn ensure_dir(&self, dir: &Path) -> OrganizeResult<()> {
        if self.dry_run || dir.is_dir() {
            return Ok(());
        }
        match fs::create_dir(dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
            Err(e) => Err(OrganizeError::DirectoryCreationFailed {
                path: dir.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Looks for a real file in `dir` with the same content.
    ///
    /// Simulated moves are not considered; they only matter for naming.
    fn find_duplicate(&self, dir: &Path, file: &Path, fingerprint: &Fingerprint) -> Option<PathBuf> {
        if !fingerprint.is_known() {
            return None;
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                if !self.dry_run {
                    tracing::warn!(dir = %dir.display(), error = %e, "cannot scan for duplicates");
                }
                return None;
            }
        };

        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|candidate| candidate.is_file() && candidate != file)
            .find(|candidate| hasher::hash_file(candidate).matches(fingerprint))
    }

    fn is_occupied(&self, candidate: &Path) -> bool {
        candidate.exists() || self.simulated.contains(candidate)
    }

    /// Moves the file and records it, or only claims the destination in dry-run mode.
    ///
    /// If the ledger cannot be written the file is moved back, so the ledger
    /// never misses a move that happened.
    fn execute_move(&mut self, src: &Path, dst: &Path) -> OrganizeResult<()> {
        if self.dry_run {
            self.simulated.insert(dst.to_path_buf());
            return Ok(());
        }

        relocate(src, dst)?;

        if let Err(e) = self.ledger.append(MoveRecord::new(src, dst)) {
            if let Err(rollback) = relocate(dst, src) {
                tracing::error!(error = %rollback, "could not roll back unrecorded move");
            }
            return Err(e);
        }
        Ok(())
    }

    fn report(&self, action: &str, relative: &str) {
        let line = format!("-> {}: {}", action, relative);
        if self.dry_run {
            OutputFormatter::dry_run_notice(&line);
        } else {
            OutputFormatter::success(&line);
        }
    }
}

/// Canonicalizes the source directory and checks that it is a directory.
pub(crate) fn resolve_root(root: &Path) -> OrganizeResult<PathBuf> {
    let resolved = fs::canonicalize(root).map_err(|e| OrganizeError::InvalidBasePath {
        path: root.to_path_buf(),
        source: e,
    })?;

    if !resolved.is_dir() {
        return Err(OrganizeError::InvalidBasePath {
            path: root.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
        });
    }
    Ok(resolved)
}

/// Moves a file, copying across filesystems when a rename is not possible.
pub(crate) fn relocate(from: &Path, to: &Path) -> OrganizeResult<()> {
    let result = match fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to).and_then(|_| fs::remove_file(from))
        }
        other => other,
    };

    result.map_err(|e| OrganizeError::FileMoveFailure {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
