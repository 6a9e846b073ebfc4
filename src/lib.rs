//! smart-organizer - sorts a directory into category folders
//!
//! This library classifies files by extension and name keywords, renames them
//! to a dated standard form, quarantines exact duplicates by content hash,
//! records every move in a history ledger that can be undone, and can keep
//! watching a directory for new files. Filtering rules come from TOML
//! configuration files.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod hasher;
pub mod history;
pub mod namer;
pub mod organizer;
pub mod output;
pub mod undo;
pub mod watch;

pub use classifier::{Category, Classifier, FileDescriptor};
pub use config::{CompiledFilters, ConfigError, OrganizerConfig};
pub use error::{OrganizeError, OrganizeResult};
pub use hasher::Fingerprint;
pub use history::{HistoryLedger, MoveRecord};
pub use organizer::{FileOutcome, OrganizerEngine};
pub use undo::{UndoManager, UndoReport};

pub use cli::{OrganizeCommand, run_cli, run_cli_with_config};
