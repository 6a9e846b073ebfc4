//! Watch mode: organize files as they appear in the target directory.
//!
//! The filesystem notifier is a black box that yields creation events. Each
//! file event waits out the settle delay, so a file that is still being
//! written is not picked up half-finished, and is then handed to the engine.

use crate::classifier::FileDescriptor;
use crate::error::{OrganizeError, OrganizeResult};
use crate::organizer::{FileOutcome, OrganizerEngine};
use crate::output::OutputFormatter;
use notify::event::CreateKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// How often the loop checks the stop flag while no events arrive.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A file-creation event from the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub is_directory: bool,
    pub path: PathBuf,
}

impl WatchEvent {
    /// Extracts creation events from a raw notifier event.
    ///
    /// Anything other than a creation yields nothing.
    pub fn from_notify(event: &Event) -> Vec<WatchEvent> {
        let EventKind::Create(kind) = &event.kind else {
            return Vec::new();
        };

        event
            .paths
            .iter()
            .map(|path| WatchEvent {
                is_directory: matches!(kind, CreateKind::Folder) || path.is_dir(),
                path: path.clone(),
            })
            .collect()
    }
}

/// Feeds creation events to the engine one at a time.
pub struct WatchAdapter<'a> {
    engine: &'a mut OrganizerEngine,
    settle_delay: Duration,
}

impl<'a> WatchAdapter<'a> {
    pub fn new(engine: &'a mut OrganizerEngine, settle_delay: Duration) -> Self {
        Self {
            engine,
            settle_delay,
        }
    }

    /// Processes one event after the settle delay.
    ///
    /// Returns `None` for events the engine never acts on (directories and
    /// hidden files, which include the history ledger itself).
    pub fn handle_event(&mut self, event: &WatchEvent) -> Option<OrganizeResult<FileOutcome>> {
        if event.is_directory || FileDescriptor::new(&event.path).is_hidden() {
            tracing::trace!(path = %event.path.display(), "ignoring event");
            return None;
        }

        thread::sleep(self.settle_delay);
        OutputFormatter::info(&format!("Detected new file: {}", event.path.display()));
        Some(self.engine.process_file(&event.path))
    }

    /// Drains `events` until `stop` is set or the sender goes away.
    ///
    /// Returns the number of files the engine handled.
    pub fn run(&mut self, events: &Receiver<notify::Result<Event>>, stop: &AtomicBool) -> usize {
        let mut handled = 0;

        while !stop.load(Ordering::SeqCst) {
            match events.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(event)) => {
                    tracing::debug!(?event, "filesystem event");
                    for watch_event in WatchEvent::from_notify(&event) {
                        match self.handle_event(&watch_event) {
                            Some(Ok(_)) => handled += 1,
                            Some(Err(e)) => OutputFormatter::error(&e.to_string()),
                            None => {}
                        }
                    }
                }
                Ok(Err(e)) => tracing::warn!(error = %e, "watcher error"),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("event source closed");
                    break;
                }
            }
        }

        handled
    }
}

/// Watches the engine's root (non-recursively) until `stop` is set.
pub fn watch_directory(
    engine: &mut OrganizerEngine,
    settle_delay: Duration,
    stop: &AtomicBool,
) -> OrganizeResult<usize> {
    let root = engine.root().to_path_buf();
    let (tx, rx) = mpsc::channel();

    let mut watcher = RecommendedWatcher::new(tx, Config::default()).map_err(|e| {
        OrganizeError::WatchFailed {
            path: root.clone(),
            source: e,
        }
    })?;
    watcher
        .watch(&root, RecursiveMode::NonRecursive)
        .map_err(|e| OrganizeError::WatchFailed {
            path: root.clone(),
            source: e,
        })?;

    let handled = WatchAdapter::new(engine, settle_delay).run(&rx, stop);

    // Dropping the watcher stops the event source
    drop(watcher);
    Ok(handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{ModifyKind, RemoveKind};
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = fs::canonicalize(temp_dir.path()).unwrap();
        (temp_dir, root)
    }

    fn created(path: PathBuf) -> notify::Result<Event> {
        Ok(Event::new(EventKind::Create(CreateKind::File)).add_path(path))
    }

    #[test]
    fn test_from_notify_keeps_only_creations() {
        let file = Event::new(EventKind::Create(CreateKind::File)).add_path("/w/a.pdf".into());
        let folder = Event::new(EventKind::Create(CreateKind::Folder)).add_path("/w/New".into());
        let modify = Event::new(EventKind::Modify(ModifyKind::Any)).add_path("/w/a.pdf".into());
        let remove = Event::new(EventKind::Remove(RemoveKind::File)).add_path("/w/a.pdf".into());

        assert_eq!(
            WatchEvent::from_notify(&file),
            vec![WatchEvent {
                is_directory: false,
                path: "/w/a.pdf".into()
            }]
        );
        assert!(WatchEvent::from_notify(&folder)[0].is_directory);
        assert!(WatchEvent::from_notify(&modify).is_empty());
        assert!(WatchEvent::from_notify(&remove).is_empty());
    }

    #[test]
    fn test_directory_and_hidden_events_are_ignored() {
        let (_guard, root) = setup();
        fs::write(root.join(".partial"), "x").unwrap();
        let mut engine = OrganizerEngine::new(&root, false).unwrap();
        let mut adapter = WatchAdapter::new(&mut engine, Duration::ZERO);

        let dir_event = WatchEvent {
            is_directory: true,
            path: root.join("Images"),
        };
        let hidden_event = WatchEvent {
            is_directory: false,
            path: root.join(".partial"),
        };

        assert!(adapter.handle_event(&dir_event).is_none());
        assert!(adapter.handle_event(&hidden_event).is_none());
        assert!(root.join(".partial").exists());
    }

    #[test]
    fn test_file_event_is_organized() {
        let (_guard, root) = setup();
        fs::write(root.join("receipt.pdf"), "paid").unwrap();
        let mut engine = OrganizerEngine::new(&root, false).unwrap();
        let mut adapter = WatchAdapter::new(&mut engine, Duration::ZERO);

        let outcome = adapter
            .handle_event(&WatchEvent {
                is_directory: false,
                path: root.join("receipt.pdf"),
            })
            .unwrap()
            .unwrap();

        assert_eq!(outcome.folder(), Some("Invoices"));
        assert!(!root.join("receipt.pdf").exists());
    }

    #[test]
    fn test_run_drains_events_until_source_closes() {
        let (_guard, root) = setup();
        fs::write(root.join("a.mp3"), "a").unwrap();
        fs::write(root.join("b.mp3"), "b").unwrap();

        let (tx, rx) = mpsc::channel();
        tx.send(created(root.join("a.mp3"))).unwrap();
        tx.send(Err(notify::Error::generic("boom"))).unwrap();
        tx.send(created(root.join("b.mp3"))).unwrap();
        tx.send(created(root.join("vanished.mp3"))).unwrap();
        drop(tx);

        let mut engine = OrganizerEngine::new(&root, false).unwrap();
        let stop = AtomicBool::new(false);
        let handled = WatchAdapter::new(&mut engine, Duration::ZERO).run(&rx, &stop);

        assert_eq!(handled, 2);
        assert_eq!(fs::read_dir(root.join("Audio")).unwrap().count(), 2);
        assert_eq!(engine.ledger().read_all().len(), 2);
    }

    #[test]
    fn test_run_stops_when_flag_is_set() {
        let (_guard, root) = setup();
        fs::write(root.join("a.mp3"), "a").unwrap();

        let (tx, rx) = mpsc::channel();
        tx.send(created(root.join("a.mp3"))).unwrap();

        let mut engine = OrganizerEngine::new(&root, false).unwrap();
        let stop = AtomicBool::new(true);
        let handled = WatchAdapter::new(&mut engine, Duration::ZERO).run(&rx, &stop);

        assert_eq!(handled, 0);
        assert!(root.join("a.mp3").exists());
    }
}
