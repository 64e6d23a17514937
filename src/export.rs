//! Export pipeline
//!
//! Re-renders a document into a fresh temp file and tries to put the image on
//! the clipboard. When the clipboard is unavailable the caller gets the file
//! path back so it can offer to reveal it instead.

use crate::clipboard::{Clipboard, ClipboardError};
use crate::render::{OutputFormat, RenderError, RenderRequest, Renderer};
use crate::tempfiles::TempFiles;
use std::path::{Path, PathBuf};

/// Prefix of exported image names
const EXPORT_PREFIX: &str = "automaton";

/// Export failures that abort the operation
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Conversion(#[from] crate::convert::ConversionError),
    #[error("Could not prepare export file: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a finished export
#[derive(Debug)]
pub enum ExportOutcome {
    /// Image placed on the clipboard
    Copied { path: PathBuf, format: OutputFormat },
    /// Image written, clipboard placement failed
    ClipboardUnavailable {
        path: PathBuf,
        format: OutputFormat,
        error: ClipboardError,
    },
}

impl ExportOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ExportOutcome::Copied { path, .. } => path,
            ExportOutcome::ClipboardUnavailable { path, .. } => path,
        }
    }
}

/// Render-to-file plus clipboard placement
pub struct ExportPipeline<'a> {
    renderer: &'a dyn Renderer,
    clipboard: &'a dyn Clipboard,
    dpi: Option<u32>,
}

impl<'a> ExportPipeline<'a> {
    pub fn new(renderer: &'a dyn Renderer, clipboard: &'a dyn Clipboard) -> Self {
        Self {
            renderer,
            clipboard,
            dpi: None,
        }
    }

    /// DPI applied to raster formats
    pub fn with_dpi(mut self, dpi: Option<u32>) -> Self {
        self.dpi = dpi;
        self
    }

    /// Render already-preprocessed `text` and place it on the clipboard
    pub fn export_as(
        &self,
        text: &str,
        format: OutputFormat,
        temp_files: &mut TempFiles,
    ) -> Result<ExportOutcome, ExportError> {
        let path = self.render_file(text, format, temp_files)?;

        match self.clipboard.copy_image(&path, format) {
            Ok(()) => {
                log::info!("Copied {} export {:?} to clipboard", format, path);
                Ok(ExportOutcome::Copied { path, format })
            }
            Err(error) => {
                log::warn!("Clipboard placement failed for {:?}: {}", path, error);
                Ok(ExportOutcome::ClipboardUnavailable { path, format, error })
            }
        }
    }

    /// Render into a fresh tracked temp file
    pub fn render_file(
        &self,
        text: &str,
        format: OutputFormat,
        temp_files: &mut TempFiles,
    ) -> Result<PathBuf, ExportError> {
        let path = temp_files.fresh_path(EXPORT_PREFIX, format.as_str())?;
        let request = RenderRequest::new(text, format).with_dpi(self.dpi);

        if let Err(e) = self.renderer.render_to_file(&request, &path) {
            // Leave nothing behind for a failed render.
            if path.exists() {
                let _ = std::fs::remove_file(&path);
            }
            return Err(e.into());
        }

        temp_files.track(&path);
        Ok(path)
    }
}

/// Open the folder containing `path` in the platform file manager
pub fn reveal_in_file_manager(path: &Path) -> std::io::Result<()> {
    let target = path.parent().unwrap_or(path);
    open::that(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DotRenderer, RenderedOutput};
    use std::cell::RefCell;

    struct FileRenderer;

    impl Renderer for FileRenderer {
        fn render(&self, request: &RenderRequest) -> Result<RenderedOutput, RenderError> {
            Ok(RenderedOutput::Svg(request.text.clone()))
        }

        fn render_to_file(&self, request: &RenderRequest, output: &Path) -> Result<(), RenderError> {
            std::fs::write(output, format!("{:?}:{}", request.dpi, request.text))?;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingClipboard {
        fail: bool,
        copied: RefCell<Vec<PathBuf>>,
    }

    impl Clipboard for RecordingClipboard {
        fn copy_image(&self, path: &Path, _format: OutputFormat) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::Unsupported("test"));
            }
            self.copied.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn test_copied_outcome_tracks_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut temp = TempFiles::in_dir(dir.path());
        let clipboard = RecordingClipboard::default();
        let pipeline = ExportPipeline::new(&FileRenderer, &clipboard).with_dpi(Some(200));

        let outcome = pipeline.export_as("digraph {}", OutputFormat::Png, &mut temp).unwrap();

        assert!(matches!(outcome, ExportOutcome::Copied { format: OutputFormat::Png, .. }));
        assert_eq!(temp.tracked(), &[outcome.path().to_path_buf()]);
        assert_eq!(clipboard.copied.borrow().len(), 1);
        assert_eq!(std::fs::read_to_string(outcome.path()).unwrap(), "Some(200):digraph {}");
    }

    #[test]
    fn test_clipboard_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut temp = TempFiles::in_dir(dir.path());
        let clipboard = RecordingClipboard {
            fail: true,
            ..Default::default()
        };
        let pipeline = ExportPipeline::new(&FileRenderer, &clipboard);

        let outcome = pipeline.export_as("digraph {}", OutputFormat::Svg, &mut temp).unwrap();

        match &outcome {
            ExportOutcome::ClipboardUnavailable { path, .. } => assert!(path.exists()),
            other => panic!("expected clipboard failure, got {:?}", other),
        }
        assert_eq!(temp.tracked().len(), 1);
    }

    #[test]
    fn test_missing_renderer_leaves_no_tracked_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut temp = TempFiles::in_dir(dir.path());
        let clipboard = RecordingClipboard::default();
        let renderer = DotRenderer::new("/nonexistent/automaton-studio/dot");
        let pipeline = ExportPipeline::new(&renderer, &clipboard);

        let err = pipeline.export_as("digraph {}", OutputFormat::Png, &mut temp).unwrap_err();

        assert!(matches!(err, ExportError::Render(RenderError::ToolMissing { .. })));
        assert!(temp.tracked().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(clipboard.copied.borrow().is_empty());
    }
}
