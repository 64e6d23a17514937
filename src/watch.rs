//! File watcher
//!
//! Watches a single source file with the `notify` crate. Events are queued on
//! a channel and drained by [`FileWatcher::poll`] from the host's own loop (the
//! CLI's `watch` command, the GUI's frame updates).
//!
//! The parent directory is watched rather than the file, so editors that save
//! by rename and files created after the watcher started are both seen.

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::{Duration, SystemTime};

/// Source file change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The file was written (or re-created)
    Modified(PathBuf),
    /// The file disappeared
    Deleted(PathBuf),
}

/// Watch errors
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Cannot resolve {0}")]
    InvalidPath(PathBuf),
    #[error("Could not watch {path}: {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: Option<SystemTime>,
    len: u64,
}

/// Watcher for one file
pub struct FileWatcher {
    path: PathBuf,
    last: Option<Stamp>,
    interval: Duration,
    rx: Receiver<notify::Result<notify::Event>>,
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `path`, taking its current state as the baseline
    pub fn new(path: impl AsRef<Path>) -> Result<Self, WatchError> {
        let path = std::path::absolute(path.as_ref())
            .map_err(|_| WatchError::InvalidPath(path.as_ref().to_path_buf()))?;
        let dir = path
            .parent()
            .ok_or_else(|| WatchError::InvalidPath(path.clone()))?
            .to_path_buf();

        let (tx, rx) = channel();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
            // Receiver gone means the FileWatcher was dropped.
            let _ = tx.send(event);
        })
        .map_err(|source| WatchError::Notify {
            path: dir.clone(),
            source,
        })?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Notify {
                path: dir.clone(),
                source,
            })?;
        log::debug!("Watching {:?}", path);

        Ok(Self {
            last: stamp(&path),
            path,
            interval: Duration::from_millis(250),
            rx,
            _watcher: watcher,
        })
    }

    /// Set how often hosts should poll
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain queued notifications without blocking.
    ///
    /// A burst of events for one save collapses into a single report, and
    /// nothing is reported when the file's metadata is unchanged.
    pub fn poll(&mut self) -> Option<WatchEvent> {
        let mut touched = false;
        for event in self.rx.try_iter() {
            match event {
                Ok(event) => touched |= event.paths.iter().any(|p| self.is_target(p)),
                Err(e) => log::warn!("Watch error on {:?}: {}", self.path, e),
            }
        }
        if !touched {
            return None;
        }

        let current = stamp(&self.path);
        if current == self.last {
            return None;
        }

        let event = match current {
            Some(_) => WatchEvent::Modified(self.path.clone()),
            None => WatchEvent::Deleted(self.path.clone()),
        };
        log::debug!("Watch event: {:?}", event);
        self.last = current;
        Some(event)
    }

    fn is_target(&self, candidate: &Path) -> bool {
        // Backends may report the directory through a different spelling
        // (symlinked temp dirs on macOS), so the file name decides.
        candidate.file_name().is_some() && candidate.file_name() == self.path.file_name()
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("path", &self.path)
            .field("interval", &self.interval)
            .finish()
    }
}

fn stamp(path: &Path) -> Option<Stamp> {
    let meta = std::fs::metadata(path).ok()?;
    Some(Stamp {
        modified: meta.modified().ok(),
        len: meta.len(),
    })
}
