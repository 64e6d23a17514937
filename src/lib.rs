//! Automaton Studio - Live Graphviz previews for automata
//!
//! Substitutes escape sequences with symbols, renders through `dot`, keeps a
//! single preview bound to the active document, and exports to the clipboard.

pub mod clipboard;
pub mod config;
pub mod convert;
pub mod document;
pub mod export;
pub mod host;
pub mod html;
pub mod i18n;
pub mod preprocess;
pub mod render;
pub mod session;
pub mod surface;
pub mod symbols;
pub mod tempfiles;
pub mod watch;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use document::{Document, DocumentId, FileSupport};
pub use export::{ExportError, ExportOutcome, ExportPipeline};
pub use host::{Host, Notification, NotificationLevel};
pub use preprocess::{preprocess, preprocess_with, strip_leading_whitespace, SubstitutionMode};
pub use render::{DotRenderer, OutputFormat, RenderError, RenderRequest, RenderedOutput, Renderer};
pub use session::{Command, PreviewError, PreviewSession, SessionEvent, SessionManager, OPEN_SETTLE_DELAY};
pub use surface::{PreviewContent, Surface, SurfaceMessage};
pub use symbols::{build_symbol_table, SymbolDecoration, SymbolTable, DEFAULT_SYMBOLS};
