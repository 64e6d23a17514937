//! Host integration
//!
//! Whatever embeds the previewer (the egui app, the CLI watcher, tests)
//! implements [`Host`] so the session can create surfaces, talk to the user
//! and touch the editor without knowing which front end it runs in.

use crate::document::DocumentId;
use crate::surface::Surface;
use crate::symbols::SymbolDecoration;
use std::path::Path;

/// Severity of a user notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

/// A non-blocking message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

/// Services the embedding front end provides to the session
pub trait Host {
    /// Create a new, empty preview surface
    fn create_surface(&mut self) -> Box<dyn Surface>;

    /// Show a non-blocking notification
    fn notify(&mut self, notification: Notification);

    /// Let the user pick one of `items`; `None` when dismissed
    fn pick(&mut self, placeholder: &str, items: &[String]) -> Option<usize>;

    /// Ask the user to choose between `choices`; `None` when dismissed
    fn prompt(&mut self, message: &str, choices: &[&str]) -> Option<usize>;

    /// Show a file in the platform file manager
    fn reveal_in_folder(&mut self, path: &Path) {
        if let Err(e) = crate::export::reveal_in_file_manager(path) {
            log::warn!("Failed to reveal {:?}: {}", path, e);
            self.notify(Notification::error(e.to_string()));
        }
    }

    /// Replace the symbol decorations shown for a document
    fn set_decorations(&mut self, _document: &DocumentId, _decorations: &[SymbolDecoration]) {}

    /// Remove every decoration
    fn clear_decorations(&mut self) {}

    /// Insert text at the caret of the active editor
    fn insert_at_caret(&mut self, _text: &str) {}
}
