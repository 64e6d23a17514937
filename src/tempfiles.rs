//! Temporary file registry
//!
//! Every file written for an export or a chart conversion lives under
//! `<os temp>/automaton-automator` and is tracked here until teardown.

use std::path::{Path, PathBuf};

/// Directory name under the OS temp dir
pub const TEMP_DIR_NAME: &str = "automaton-automator";

/// Append-only list of temp files owned by this process
#[derive(Debug)]
pub struct TempFiles {
    dir: PathBuf,
    files: Vec<PathBuf>,
    counter: u64,
}

impl TempFiles {
    /// Registry rooted at `<os temp>/automaton-automator`
    pub fn new() -> Self {
        Self::in_dir(std::env::temp_dir().join(TEMP_DIR_NAME))
    }

    /// Registry rooted at a custom directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
            counter: 0,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fresh, timestamped path `<dir>/<prefix>-<millis>[-n].<ext>`, creating the directory
    pub fn fresh_path(&mut self, prefix: &str, extension: &str) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let stamp = chrono::Utc::now().timestamp_millis();
        loop {
            let name = if self.counter == 0 {
                format!("{}-{}.{}", prefix, stamp, extension)
            } else {
                format!("{}-{}-{}.{}", prefix, stamp, self.counter, extension)
            };
            self.counter += 1;

            let path = self.dir.join(name);
            if !path.exists() && !self.files.contains(&path) {
                return Ok(path);
            }
        }
    }

    /// Remember a file for deletion at teardown
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        log::debug!("Tracking temp file {:?}", path);
        self.files.push(path);
    }

    pub fn tracked(&self) -> &[PathBuf] {
        &self.files
    }

    /// Stop tracking `path` so teardown leaves it on disk
    pub fn untrack(&mut self, path: &Path) -> bool {
        let before = self.files.len();
        self.files.retain(|tracked| tracked != path);
        before != self.files.len()
    }

    /// Delete every tracked file; failures are logged, never surfaced
    pub fn cleanup(&mut self) {
        for path in self.files.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => log::debug!("Removed temp file {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove temp file {:?}: {}", path, e),
            }
        }
    }
}

impl Default for TempFiles {
    fn default() -> Self {
        Self::new()
    }
}
