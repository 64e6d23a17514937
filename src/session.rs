//! Preview session
//!
//! A single [`SessionManager`] is created at startup and owns the only
//! preview surface. Hosts feed it [`SessionEvent`]s and [`Command`]s serially;
//! it keeps the surface bound to the active supported document, re-renders on
//! edits, and runs exports.
//!
//! ```text
//! Closed --show_preview(doc)--> Open(doc, surface)
//! Open   --active changed to supported doc--> Open(doc', surface)
//! Open   --active changed to nothing--------> Closed
//! Open   --surface disposed by user---------> Closed
//! Open   --render failed--------------------> Open (last good output + diagnostic)
//! ```

use crate::clipboard::{Clipboard, SystemClipboard};
use crate::config::Config;
use crate::convert::{self, ChartConverter, ConversionError, JavaChartConverter};
use crate::document::{Document, DocumentId, FileSupport};
use crate::export::{ExportError, ExportOutcome, ExportPipeline};
use crate::host::{Host, Notification};
use crate::i18n::Messages;
use crate::preprocess::{preprocess_with, SubstitutionMode};
use crate::render::{DotRenderer, OutputFormat, RenderError, RenderRequest, Renderer};
use crate::surface::{PreviewContent, Surface, SurfaceMessage};
use crate::symbols::{symbol_choices, SymbolTable};
use crate::tempfiles::TempFiles;
use std::time::Duration;

/// How long hosts wait after opening a document before the first render
pub const OPEN_SETTLE_DELAY: Duration = Duration::from_millis(300);

/// Editor and surface events delivered by the host
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A document was opened in the editor
    DocumentOpened(Document),
    /// Focus moved to another document, or to none at all
    ActiveDocumentChanged(Option<Document>),
    /// A document's text changed
    DocumentEdited(Document),
    /// The user closed the preview surface
    SurfaceDisposed,
    /// Raw JSON posted by the surface's controls
    MessageReceived(String),
    /// Settings were reloaded
    ConfigurationChanged(Config),
}

/// User-invoked commands, run against the active document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ShowPreview,
    CopyAsPng,
    CopyAsSvg,
    InsertSymbol,
}

/// Why a preview render failed
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// A live preview bound to one document
pub struct OpenPreview {
    document: Document,
    surface: Box<dyn Surface>,
    last_rendered: Option<String>,
}

impl OpenPreview {
    /// Snapshot of the bound document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Output of the latest successful render
    pub fn last_rendered(&self) -> Option<&str> {
        self.last_rendered.as_deref()
    }
}

/// Session state
#[derive(Default)]
pub enum PreviewSession {
    #[default]
    Closed,
    Open(OpenPreview),
}

impl PreviewSession {
    pub fn is_open(&self) -> bool {
        matches!(self, PreviewSession::Open(_))
    }

    pub fn open(&self) -> Option<&OpenPreview> {
        match self {
            PreviewSession::Open(open) => Some(open),
            PreviewSession::Closed => None,
        }
    }

    /// Id of the bound document; `None` while closed
    pub fn bound_document(&self) -> Option<&DocumentId> {
        self.open().map(|open| &open.document.id)
    }
}

/// Owns the preview session and everything it renders with
pub struct SessionManager<H: Host> {
    host: H,
    config: Config,
    messages: Messages,
    table: SymbolTable,
    support: FileSupport,
    renderer: Box<dyn Renderer>,
    converter: Box<dyn ChartConverter>,
    clipboard: Box<dyn Clipboard>,
    temp_files: TempFiles,
    session: PreviewSession,
    active: Option<Document>,
    custom_renderer: bool,
    custom_converter: bool,
}

impl<H: Host> SessionManager<H> {
    /// Manager using `dot`, the Java chart runner and the system clipboard
    pub fn new(host: H, config: Config) -> Self {
        Self {
            host,
            messages: config.language.messages(),
            table: config.symbol_table(),
            support: FileSupport::from_config(&config),
            renderer: Box::new(DotRenderer::from_config(&config)),
            converter: Box::new(JavaChartConverter::from_config(&config)),
            clipboard: Box::new(SystemClipboard),
            temp_files: TempFiles::new(),
            session: PreviewSession::Closed,
            active: None,
            custom_renderer: false,
            custom_converter: false,
            config,
        }
    }

    /// Use a specific renderer; kept across configuration changes
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self.custom_renderer = true;
        self
    }

    /// Use a specific chart converter; kept across configuration changes
    pub fn with_converter(mut self, converter: impl ChartConverter + 'static) -> Self {
        self.converter = Box::new(converter);
        self.custom_converter = true;
        self
    }

    pub fn with_clipboard(mut self, clipboard: impl Clipboard + 'static) -> Self {
        self.clipboard = Box::new(clipboard);
        self
    }

    pub fn with_temp_files(mut self, temp_files: TempFiles) -> Self {
        self.temp_files = temp_files;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn messages(&self) -> Messages {
        self.messages
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn file_support(&self) -> &FileSupport {
        &self.support
    }

    pub fn session(&self) -> &PreviewSession {
        &self.session
    }

    pub fn is_open(&self) -> bool {
        self.session.is_open()
    }

    /// Snapshot of the bound document
    pub fn bound_document(&self) -> Option<&Document> {
        self.session.open().map(|open| &open.document)
    }

    pub fn active_document(&self) -> Option<&Document> {
        self.active.as_ref()
    }

    pub fn temp_files(&self) -> &TempFiles {
        &self.temp_files
    }

    /// Whether the previewer handles `document`
    pub fn is_supported(&self, document: &Document) -> bool {
        self.support.is_supported(document)
    }

    /// Process one host event
    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::DocumentOpened(document) => self.on_document_opened(document),
            SessionEvent::ActiveDocumentChanged(document) => self.on_active_changed(document),
            SessionEvent::DocumentEdited(document) => self.on_document_edited(document),
            SessionEvent::SurfaceDisposed => self.on_surface_disposed(),
            SessionEvent::MessageReceived(json) => self.on_message(&json),
            SessionEvent::ConfigurationChanged(config) => self.apply_config(config),
        }
    }

    /// Run a command against the active document
    pub fn execute(&mut self, command: Command) {
        if command == Command::InsertSymbol {
            self.insert_symbol();
            return;
        }

        let Some(document) = self.active_supported() else {
            log::debug!("{:?} ignored: no supported active document", command);
            return;
        };

        match command {
            Command::ShowPreview => self.show_preview(document),
            Command::CopyAsPng => {
                self.copy_as(&document, OutputFormat::Png);
            }
            Command::CopyAsSvg => {
                self.copy_as(&document, OutputFormat::Svg);
            }
            Command::InsertSymbol => {}
        }
    }

    /// Open (or reveal) the preview and bind it to `document`
    pub fn show_preview(&mut self, document: Document) {
        if !self.support.is_supported(&document) {
            log::debug!("Not previewing unsupported document {}", document.id);
            return;
        }

        if !self.session.is_open() {
            log::info!("Opening preview for {}", document.id);
            let surface = self.host.create_surface();
            self.session = PreviewSession::Open(OpenPreview {
                document: document.clone(),
                surface,
                last_rendered: None,
            });
        }

        self.rebind(document);
        if let PreviewSession::Open(open) = &mut self.session {
            open.surface.reveal();
        }
    }

    /// Close the preview from our side
    pub fn close_preview(&mut self) {
        if let PreviewSession::Open(mut open) = std::mem::take(&mut self.session) {
            log::info!("Closing preview for {}", open.document.id);
            open.surface.dispose();
        }
    }

    /// Export `document` and report the outcome to the user.
    ///
    /// Returns the outcome when an image was written.
    pub fn copy_as(&mut self, document: &Document, format: OutputFormat) -> Option<ExportOutcome> {
        match self.export(document, format) {
            Ok(outcome @ ExportOutcome::Copied { .. }) => {
                self.host
                    .notify(Notification::info(self.messages.copied(format.as_str())));
                Some(outcome)
            }
            Ok(outcome @ ExportOutcome::ClipboardUnavailable { .. }) => {
                let choice = self
                    .host
                    .prompt(self.messages.clipboard_failed(), &[self.messages.reveal_option()]);
                if choice == Some(0) {
                    self.host.reveal_in_folder(outcome.path());
                }
                Some(outcome)
            }
            Err(e) => {
                log::warn!("Export of {} as {} failed: {}", document.id, format, e);
                self.host.notify(Notification::error(
                    self.messages.export_failed(format.as_str(), &e.to_string()),
                ));
                None
            }
        }
    }

    /// Exclude an exported image from teardown while something still needs it:
    /// the file offered in place of the clipboard, or a clipboard that only
    /// references the file. Returns whether the image was kept.
    pub fn retain_export(&mut self, outcome: &ExportOutcome) -> bool {
        let needed = match outcome {
            ExportOutcome::ClipboardUnavailable { .. } => true,
            ExportOutcome::Copied { .. } => self.clipboard.holds_file_reference(),
        };
        needed && self.temp_files.untrack(outcome.path())
    }

    /// Dispose the surface, drop decorations and delete every temp file
    pub fn teardown(&mut self) {
        self.close_preview();
        self.host.clear_decorations();
        self.temp_files.cleanup();
        log::info!("Preview session torn down");
    }

    fn on_document_opened(&mut self, document: Document) {
        let is_active = self.active.as_ref().is_some_and(|a| a.id == document.id);
        if !is_active {
            return;
        }

        self.active = Some(document.clone());
        if self.config.auto_preview && self.support.is_supported(&document) {
            self.show_preview(document);
        }
    }

    fn on_active_changed(&mut self, document: Option<Document>) {
        let Some(document) = document else {
            self.active = None;
            self.host.clear_decorations();
            self.close_preview();
            return;
        };

        self.active = Some(document.clone());
        if !self.support.is_supported(&document) {
            return;
        }

        self.update_decorations(&document);
        if self.session.is_open() {
            self.rebind(document);
        } else if self.config.auto_preview {
            self.show_preview(document);
        }
    }

    fn on_document_edited(&mut self, document: Document) {
        if self.active.as_ref().is_some_and(|a| a.id == document.id) {
            self.active = Some(document.clone());
            if self.support.is_supported(&document) {
                self.update_decorations(&document);
            }
        }

        if let PreviewSession::Open(open) = &mut self.session {
            if open.document.id == document.id {
                open.document = document;
                self.render_preview();
            }
        }
    }

    fn on_surface_disposed(&mut self) {
        if let PreviewSession::Open(open) = std::mem::take(&mut self.session) {
            log::info!("Preview for {} closed by user", open.document.id);
        }
    }

    fn on_message(&mut self, json: &str) {
        let message = match SurfaceMessage::parse(json) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Ignoring surface message {}: {}", json, e);
                return;
            }
        };

        let Some(document) = self.bound_document().cloned() else {
            log::debug!("Surface message {:?} without a bound document", message);
            return;
        };

        let format = match message {
            SurfaceMessage::CopyAsPng => OutputFormat::Png,
            SurfaceMessage::CopyAsSvg => OutputFormat::Svg,
        };
        self.copy_as(&document, format);
    }

    fn apply_config(&mut self, config: Config) {
        log::info!("Applying configuration change");
        self.messages = config.language.messages();
        self.table = config.symbol_table();
        self.support = FileSupport::from_config(&config);
        if !self.custom_renderer {
            self.renderer = Box::new(DotRenderer::from_config(&config));
        }
        if !self.custom_converter {
            self.converter = Box::new(JavaChartConverter::from_config(&config));
        }
        self.config = config;

        match self.active.clone() {
            Some(document) if self.support.is_supported(&document) => {
                self.update_decorations(&document)
            }
            _ => self.host.clear_decorations(),
        }
        if self.session.is_open() {
            self.render_preview();
        }
    }

    fn insert_symbol(&mut self) {
        let choices = symbol_choices(self.messages.locale());
        let labels: Vec<String> = choices.iter().map(|c| c.label.clone()).collect();

        let picked = self
            .host
            .pick(self.messages.pick_symbol_placeholder(), &labels)
            .and_then(|index| choices.get(index));
        if let Some(choice) = picked {
            self.host.insert_at_caret(choice.symbol);
        }
    }

    fn active_supported(&self) -> Option<Document> {
        self.active
            .as_ref()
            .filter(|document| self.support.is_supported(document))
            .cloned()
    }

    fn update_decorations(&mut self, document: &Document) {
        if self.config.symbol_decorations {
            let decorations = self.table.decorations(&document.text);
            self.host.set_decorations(&document.id, &decorations);
        } else {
            self.host.clear_decorations();
        }
    }

    /// Point the open surface at `document` and render it
    fn rebind(&mut self, document: Document) {
        if let PreviewSession::Open(open) = &mut self.session {
            // The last good render stays on screen across documents.
            if open.document.id != document.id {
                log::debug!("Rebinding preview to {}", document.id);
            }
            open.document = document;
        }
        self.render_preview();
    }

    fn render_preview(&mut self) {
        let PreviewSession::Open(open) = &mut self.session else {
            return;
        };

        let title = self.messages.preview_title(&open.document.display_name());
        let converter = self
            .config
            .enable_program_chart_designer
            .then_some(&*self.converter);
        let result = preview_svg(
            &open.document,
            converter,
            &self.table,
            self.config.substitution_mode,
            self.renderer.as_ref(),
            &mut self.temp_files,
        );

        let content = match result {
            Ok(svg) => {
                open.last_rendered = Some(svg.clone());
                PreviewContent::rendered(title, svg)
            }
            Err(e) => {
                log::warn!("Preview of {} failed: {}", open.document.id, e);
                if let PreviewError::Conversion(_) = e {
                    self.host.notify(Notification::error(e.to_string()));
                }
                PreviewContent::failed(title, open.last_rendered.clone(), e.to_string())
            }
        };
        open.surface.present(&content);
    }

    fn export(&mut self, document: &Document, format: OutputFormat) -> Result<ExportOutcome, ExportError> {
        let converter = self
            .config
            .enable_program_chart_designer
            .then_some(&*self.converter);
        let source = convert::source_for(document, converter, &mut self.temp_files)?;
        let text = preprocess_with(&source, &self.table, self.config.substitution_mode);

        ExportPipeline::new(self.renderer.as_ref(), self.clipboard.as_ref())
            .with_dpi(self.config.dpi())
            .export_as(&text, format, &mut self.temp_files)
    }
}

/// Convert, preprocess and render a document to SVG
fn preview_svg(
    document: &Document,
    converter: Option<&dyn ChartConverter>,
    table: &SymbolTable,
    mode: SubstitutionMode,
    renderer: &dyn Renderer,
    temp_files: &mut TempFiles,
) -> Result<String, PreviewError> {
    let source = convert::source_for(document, converter, temp_files)?;
    let text = preprocess_with(&source, table, mode);
    let output = renderer.render(&RenderRequest::preview(text))?;
    output
        .into_svg()
        .ok_or(PreviewError::Render(RenderError::InvalidUtf8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChartLanguage;
    use crate::render::RenderedOutput;
    use crate::symbols::SymbolDecoration;
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorded {
        presented: Vec<PreviewContent>,
        surfaces_created: usize,
        disposed: usize,
        notifications: Vec<Notification>,
        decorations: Vec<(DocumentId, usize)>,
        inserted: Vec<String>,
    }

    struct RecordingSurface(Rc<RefCell<Recorded>>);

    impl Surface for RecordingSurface {
        fn present(&mut self, content: &PreviewContent) {
            self.0.borrow_mut().presented.push(content.clone());
        }

        fn dispose(&mut self) {
            self.0.borrow_mut().disposed += 1;
        }
    }

    #[derive(Default)]
    struct TestHost {
        log: Rc<RefCell<Recorded>>,
        pick: Option<usize>,
    }

    impl Host for TestHost {
        fn create_surface(&mut self) -> Box<dyn Surface> {
            self.log.borrow_mut().surfaces_created += 1;
            Box::new(RecordingSurface(self.log.clone()))
        }

        fn notify(&mut self, notification: Notification) {
            self.log.borrow_mut().notifications.push(notification);
        }

        fn pick(&mut self, _placeholder: &str, _items: &[String]) -> Option<usize> {
            self.pick
        }

        fn prompt(&mut self, _message: &str, _choices: &[&str]) -> Option<usize> {
            None
        }

        fn set_decorations(&mut self, document: &DocumentId, decorations: &[SymbolDecoration]) {
            self.log
                .borrow_mut()
                .decorations
                .push((document.clone(), decorations.len()));
        }

        fn insert_at_caret(&mut self, text: &str) {
            self.log.borrow_mut().inserted.push(text.to_string());
        }
    }

    /// Echoes the preprocessed text; rejects anything containing "broken"
    struct EchoRenderer;

    impl Renderer for EchoRenderer {
        fn render(&self, request: &RenderRequest) -> Result<RenderedOutput, RenderError> {
            if request.text.contains("broken") {
                return Err(RenderError::Rejected("syntax error in line 1".into()));
            }
            Ok(RenderedOutput::Svg(format!("<svg>{}</svg>", request.text)))
        }

        fn render_to_file(&self, _request: &RenderRequest, _output: &Path) -> Result<(), RenderError> {
            Ok(())
        }
    }

    /// Stages the source like the Java runner, then produces nothing
    struct SilentConverter;

    impl ChartConverter for SilentConverter {
        fn convert(
            &self,
            _language: ChartLanguage,
            document: &Document,
            temp_files: &mut TempFiles,
        ) -> Result<String, ConversionError> {
            let staged = temp_files.fresh_path("automaton-tmp", "c")?;
            std::fs::write(&staged, &document.text)?;
            temp_files.track(&staged);
            Err(ConversionError::EmptyOutput)
        }
    }

    fn manager(config: Config) -> (SessionManager<TestHost>, Rc<RefCell<Recorded>>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let host = TestHost::default();
        let log = host.log.clone();
        let manager = SessionManager::new(host, config)
            .with_renderer(EchoRenderer)
            .with_temp_files(TempFiles::in_dir(dir.path()));
        (manager, log, dir)
    }

    fn manual_config() -> Config {
        Config {
            auto_preview: false,
            ..Config::default()
        }
    }

    #[test]
    fn test_show_preview_opens_and_renders() {
        let (mut manager, log, _dir) = manager(manual_config());
        let doc = Document::new("/tmp/a.auto", "digraph { a -> b [label=\"\\epsilon\"] }");

        assert!(!manager.is_open());
        manager.show_preview(doc.clone());

        assert!(manager.is_open());
        assert_eq!(manager.session().bound_document(), Some(&doc.id));
        let log = log.borrow();
        assert_eq!(log.surfaces_created, 1);
        let last = log.presented.last().unwrap();
        assert_eq!(last.title, "Preview: a.auto");
        assert_eq!(last.svg.as_deref(), Some("<svg>digraph { a -> b [label=\"ε\"] }</svg>"));
    }

    #[test]
    fn test_show_preview_ignores_unsupported_documents() {
        let (mut manager, log, _dir) = manager(manual_config());
        manager.show_preview(Document::new("/tmp/notes.txt", "hello"));

        assert!(!manager.is_open());
        assert_eq!(log.borrow().surfaces_created, 0);
    }

    #[test]
    fn test_second_show_preview_reuses_surface() {
        let (mut manager, log, _dir) = manager(manual_config());
        manager.show_preview(Document::new("/tmp/a.auto", "digraph {}"));
        manager.show_preview(Document::new("/tmp/b.dot", "digraph {}"));

        assert_eq!(log.borrow().surfaces_created, 1);
        assert_eq!(manager.bound_document().unwrap().display_name(), "b.dot");
    }

    #[test]
    fn test_user_close_clears_binding() {
        let (mut manager, log, _dir) = manager(manual_config());
        manager.show_preview(Document::new("/tmp/a.auto", "digraph {}"));
        manager.handle(SessionEvent::SurfaceDisposed);

        assert!(!manager.is_open());
        assert!(manager.session().bound_document().is_none());
        // The user already closed it; nothing to dispose from our side.
        assert_eq!(log.borrow().disposed, 0);
    }

    #[test]
    fn test_render_failure_keeps_last_output_and_binding() {
        let (mut manager, log, _dir) = manager(manual_config());
        let doc = Document::new("/tmp/a.auto", "digraph { a }");
        manager.show_preview(doc.clone());

        let broken = Document::new("/tmp/a.auto", "digraph { broken");
        manager.handle(SessionEvent::DocumentEdited(broken));

        assert!(manager.is_open());
        assert_eq!(manager.session().bound_document(), Some(&doc.id));
        let log = log.borrow();
        let last = log.presented.last().unwrap();
        assert_eq!(last.svg.as_deref(), Some("<svg>digraph { a }</svg>"));
        assert_eq!(last.diagnostic.as_deref(), Some("syntax error in line 1"));
        assert_eq!(last.title, "Preview: a.auto");
    }

    #[test]
    fn test_edits_to_other_documents_do_not_render() {
        let (mut manager, log, _dir) = manager(manual_config());
        manager.show_preview(Document::new("/tmp/a.auto", "digraph {}"));
        let before = log.borrow().presented.len();

        manager.handle(SessionEvent::DocumentEdited(Document::new("/tmp/b.auto", "digraph { x }")));
        assert_eq!(log.borrow().presented.len(), before);
    }

    #[test]
    fn test_active_change_transitions() {
        let (mut manager, log, _dir) = manager(manual_config());
        manager.show_preview(Document::new("/tmp/a.auto", "digraph {}"));

        // Unsupported document leaves the preview untouched.
        manager.handle(SessionEvent::ActiveDocumentChanged(Some(Document::new("/tmp/x.rs", "fn main() {}"))));
        assert_eq!(manager.bound_document().unwrap().display_name(), "a.auto");

        // Supported document rebinds.
        manager.handle(SessionEvent::ActiveDocumentChanged(Some(Document::new("/tmp/b.dot", "digraph {}"))));
        assert_eq!(manager.bound_document().unwrap().display_name(), "b.dot");

        // No document closes.
        manager.handle(SessionEvent::ActiveDocumentChanged(None));
        assert!(!manager.is_open());
        assert_eq!(log.borrow().disposed, 1);
    }

    #[test]
    fn test_auto_preview_opens_on_focus() {
        let (mut manager, log, _dir) = manager(Config::default());
        manager.handle(SessionEvent::ActiveDocumentChanged(Some(Document::new("/tmp/a.auto", "digraph {}"))));

        assert!(manager.is_open());
        assert_eq!(log.borrow().surfaces_created, 1);
    }

    #[test]
    fn test_document_opened_only_previews_active_document() {
        let (mut manager, _log, _dir) = manager(Config::default());
        manager.handle(SessionEvent::DocumentOpened(Document::new("/tmp/a.auto", "digraph {}")));
        assert!(!manager.is_open());

        manager.handle(SessionEvent::ActiveDocumentChanged(Some(Document::new("/tmp/x.txt", ""))));
        manager.handle(SessionEvent::DocumentOpened(Document::new("/tmp/x.txt", "")));
        assert!(!manager.is_open());
    }

    #[test]
    fn test_decorations_follow_edits() {
        let (mut manager, log, _dir) = manager(manual_config());
        let doc = Document::new("/tmp/a.auto", "\\epsilon \\sigma");
        manager.handle(SessionEvent::ActiveDocumentChanged(Some(doc.clone())));
        manager.handle(SessionEvent::DocumentEdited(Document::new("/tmp/a.auto", "\\epsilon")));

        let log = log.borrow();
        assert_eq!(log.decorations, vec![(doc.id.clone(), 2), (doc.id.clone(), 1)]);
    }

    #[test]
    fn test_insert_symbol_uses_pick() {
        let (mut manager, log, _dir) = manager(manual_config());
        manager.host_mut().pick = Some(0);
        manager.execute(Command::InsertSymbol);

        assert_eq!(log.borrow().inserted, vec!["ε".to_string()]);
    }

    #[test]
    fn test_configuration_change_rebuilds_table_and_titles() {
        let (mut manager, log, _dir) = manager(manual_config());
        manager.show_preview(Document::new("/tmp/a.auto", "\\lambda"));

        let mut config = manual_config();
        config.language = crate::i18n::Locale::Es;
        config.symbol_mappings.insert("\\lambda".into(), "λ".into());
        manager.handle(SessionEvent::ConfigurationChanged(config));

        let log = log.borrow();
        let last = log.presented.last().unwrap();
        assert_eq!(last.title, "Vista previa: a.auto");
        assert_eq!(last.svg.as_deref(), Some("<svg>λ</svg>"));
    }

    #[test]
    fn test_teardown_disposes_surface() {
        let (mut manager, log, _dir) = manager(manual_config());
        manager.show_preview(Document::new("/tmp/a.auto", "digraph {}"));
        manager.teardown();

        assert!(!manager.is_open());
        assert_eq!(log.borrow().disposed, 1);
    }

    #[test]
    fn test_invalid_surface_message_is_ignored() {
        let (mut manager, log, _dir) = manager(manual_config());
        manager.show_preview(Document::new("/tmp/a.auto", "digraph {}"));
        manager.handle(SessionEvent::MessageReceived("{\"command\":\"zoomIn\"}".into()));

        assert!(log.borrow().notifications.is_empty());
        assert!(manager.is_open());
    }

    #[test]
    fn test_switch_to_failing_document_keeps_previous_graph() {
        let (mut manager, log, _dir) = manager(Config::default());
        manager.handle(SessionEvent::ActiveDocumentChanged(Some(Document::new("/tmp/a.auto", "digraph { a }"))));

        let broken = Document::new("/tmp/b.auto", "broken");
        manager.handle(SessionEvent::ActiveDocumentChanged(Some(broken.clone())));

        assert_eq!(manager.session().bound_document(), Some(&broken.id));
        let log = log.borrow();
        let last = log.presented.last().unwrap();
        assert_eq!(last.svg.as_deref(), Some("<svg>digraph { a }</svg>"));
        assert_eq!(last.diagnostic.as_deref(), Some("syntax error in line 1"));
        assert_eq!(last.title, "Preview: b.auto");
    }

    #[test]
    fn test_conversion_failure_notifies_and_keeps_binding() {
        let config = Config {
            enable_program_chart_designer: true,
            ..manual_config()
        };
        let (manager, log, _dir) = manager(config);
        let mut manager = manager.with_converter(SilentConverter);
        let source = Document::new("/tmp/main.c", "int main() { return 0; }");

        manager.show_preview(source.clone());

        assert!(manager.is_open());
        assert_eq!(manager.session().bound_document(), Some(&source.id));
        let staged = manager.temp_files().tracked().to_vec();
        assert_eq!(staged.len(), 1);
        assert!(staged[0].exists());
        {
            let log = log.borrow();
            let last = log.presented.last().unwrap();
            assert!(last.svg.is_none());
            assert_eq!(
                last.diagnostic.as_deref(),
                Some("The chart designer returned no DOT content.")
            );
            assert_eq!(log.notifications.len(), 1);
            assert!(log.notifications[0].is_error());
        }

        manager.teardown();
        assert!(!staged[0].exists());
        assert!(manager.temp_files().tracked().is_empty());
    }
}
