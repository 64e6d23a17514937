//! Automaton Studio - egui front end
//!
//! Source editor on the left, live Graphviz preview on the right. The preview
//! pane is the session's surface; editor activity is forwarded to the session
//! as events.

use automaton_studio::config::Config;
use automaton_studio::document::{Document, DocumentId};
use automaton_studio::host::{Host, Notification, NotificationLevel};
use automaton_studio::i18n::Locale;
use automaton_studio::preprocess::SubstitutionMode;
use automaton_studio::render::DotRenderer;
use automaton_studio::session::{Command, SessionEvent, SessionManager, OPEN_SETTLE_DELAY};
use automaton_studio::surface::{PreviewContent, Surface, SurfaceMessage};
use automaton_studio::symbols::{insert_at, symbol_choices, SymbolDecoration};
use automaton_studio::watch::{FileWatcher, WatchEvent};
use clap::Parser;
use eframe::egui::{self, Color32, FontId, RichText};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a notification stays on screen
const TOAST_DURATION: Duration = Duration::from_secs(5);

const ESCAPE_COLOR: Color32 = Color32::from_rgb(86, 156, 214);
const DECORATION_COLOR: Color32 = Color32::from_rgb(78, 201, 176);
const ERROR_COLOR: Color32 = Color32::from_rgb(244, 135, 113);

const SAMPLE: &str = "digraph {\n    rankdir=LR;\n    node [shape=circle];\n    q0 -> q1 [label=\"\\epsilon\"];\n    q1 -> q2 [label=\"a\"];\n    q2 [shape=doublecircle];\n}\n";

#[derive(Parser)]
#[command(name = "automaton-studio")]
#[command(author = "e421")]
#[command(version = "0.3.0")]
#[command(about = "Automaton Studio - Live previews for automata written in DOT")]
struct Args {
    /// File to open (.auto, .dot)
    file: Option<PathBuf>,
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 820.0])
            .with_min_inner_size([800.0, 500.0])
            .with_title("Automaton Studio"),
        ..Default::default()
    };

    eframe::run_native(
        "Automaton Studio",
        options,
        Box::new(move |cc| {
            egui_extras::install_image_loaders(&cc.egui_ctx);
            configure_fonts(&cc.egui_ctx);
            Ok(Box::new(AutomatonStudio::new(args.file)))
        }),
    )
}

/// Add system fonts that cover the automata symbols (∅, ⊔, ∩ ...)
fn configure_fonts(ctx: &egui::Context) {
    use egui::{FontData, FontDefinitions, FontFamily};

    let mut fonts = FontDefinitions::default();
    let mut font_paths: Vec<PathBuf> = vec![
        "/run/current-system/sw/share/X11/fonts/DejaVuSans.ttf".into(),
        "/usr/share/fonts/TTF/DejaVuSans.ttf".into(),
        "/usr/share/fonts/dejavu/DejaVuSans.ttf".into(),
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".into(),
        "/usr/share/fonts/noto/NotoSansMath-Regular.ttf".into(),
        "/usr/share/fonts/truetype/noto/NotoSansMath-Regular.ttf".into(),
        "/System/Library/Fonts/Supplemental/Arial Unicode.ttf".into(),
        "C:\\Windows\\Fonts\\seguisym.ttf".into(),
    ];
    if let Some(home) = dirs::home_dir() {
        font_paths.push(home.join(".local/share/fonts/DejaVuSans.ttf"));
    }

    let Some((name, data)) = font_paths.iter().find_map(|path| {
        let data = std::fs::read(path).ok()?;
        let name = path.file_stem()?.to_string_lossy().to_string();
        Some((name, data))
    }) else {
        log::debug!("No symbol fallback font found, using egui defaults");
        return;
    };

    log::info!("Using {} as symbol fallback font", name);
    fonts.font_data.insert(name.clone(), FontData::from_owned(data).into());
    for family in [FontFamily::Proportional, FontFamily::Monospace] {
        fonts.families.entry(family).or_default().push(name.clone());
    }
    ctx.set_fonts(fonts);
}

/// What the preview pane currently shows
#[derive(Default)]
struct PaneState {
    content: Option<PreviewContent>,
    revision: u64,
}

/// Surface drawn by the preview side panel
struct PaneSurface {
    pane: Rc<RefCell<PaneState>>,
}

impl Surface for PaneSurface {
    fn present(&mut self, content: &PreviewContent) {
        let mut pane = self.pane.borrow_mut();
        pane.content = Some(content.clone());
        pane.revision += 1;
    }

    fn dispose(&mut self) {
        self.pane.borrow_mut().content = None;
    }
}

struct Toast {
    notification: Notification,
    shown_at: Instant,
}

/// egui side of the session
struct EguiHost {
    pane: Rc<RefCell<PaneState>>,
    toasts: Vec<Toast>,
    decorations: Vec<SymbolDecoration>,
    queued_pick: Option<usize>,
    pending_insert: Option<String>,
}

impl EguiHost {
    fn new(pane: Rc<RefCell<PaneState>>) -> Self {
        Self {
            pane,
            toasts: Vec::new(),
            decorations: Vec::new(),
            queued_pick: None,
            pending_insert: None,
        }
    }
}

impl Host for EguiHost {
    fn create_surface(&mut self) -> Box<dyn Surface> {
        Box::new(PaneSurface {
            pane: self.pane.clone(),
        })
    }

    fn notify(&mut self, notification: Notification) {
        log::info!("Notification: {}", notification.message);
        self.toasts.push(Toast {
            notification,
            shown_at: Instant::now(),
        });
    }

    // Choices come from the Insert menu, queued before the command runs.
    fn pick(&mut self, _placeholder: &str, _items: &[String]) -> Option<usize> {
        self.queued_pick.take()
    }

    fn prompt(&mut self, message: &str, choices: &[&str]) -> Option<usize> {
        let first = choices.first()?;
        let result = rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Warning)
            .set_title("Automaton Studio")
            .set_description(message)
            .set_buttons(rfd::MessageButtons::OkCancelCustom(
                first.to_string(),
                "Cancel".to_string(),
            ))
            .show();

        match result {
            rfd::MessageDialogResult::Ok | rfd::MessageDialogResult::Yes => Some(0),
            rfd::MessageDialogResult::Custom(label) if label == *first => Some(0),
            _ => None,
        }
    }

    fn set_decorations(&mut self, _document: &DocumentId, decorations: &[SymbolDecoration]) {
        self.decorations = non_overlapping(decorations);
    }

    fn clear_decorations(&mut self) {
        self.decorations.clear();
    }

    fn insert_at_caret(&mut self, text: &str) {
        self.pending_insert = Some(text.to_string());
    }
}

/// Start watching an opened file; the editor still works without it
fn watch_file(path: &Path) -> Option<FileWatcher> {
    FileWatcher::new(path)
        .map_err(|e| log::warn!("{}", e))
        .ok()
}

/// Drop decorations that start inside an earlier one (`\emptyset` vs `\empty`)
fn non_overlapping(decorations: &[SymbolDecoration]) -> Vec<SymbolDecoration> {
    let mut visible: Vec<SymbolDecoration> = Vec::with_capacity(decorations.len());
    for decoration in decorations {
        let overlaps = visible
            .last()
            .is_some_and(|last| decoration.range.start < last.range.end);
        if !overlaps {
            visible.push(decoration.clone());
        }
    }
    visible
}

/// The open source file
struct Editor {
    path: PathBuf,
    text: String,
    caret: usize,
    dirty: bool,
    untitled: bool,
    pending_caret: Option<usize>,
}

impl Editor {
    fn new(path: PathBuf, text: String, untitled: bool) -> Self {
        Self {
            path,
            text,
            caret: 0,
            dirty: untitled,
            untitled,
            pending_caret: None,
        }
    }

    fn document(&self) -> Document {
        Document::new(&self.path, self.text.clone())
    }

    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "untitled.auto".to_string())
    }
}

/// Decoded SVG handed to the image loader
struct PreviewImage {
    revision: u64,
    uri: String,
    bytes: Arc<[u8]>,
}

enum PreviewAction {
    Message(SurfaceMessage),
    Close,
}

struct AutomatonStudio {
    manager: SessionManager<EguiHost>,
    pane: Rc<RefCell<PaneState>>,
    editor: Option<Editor>,
    watcher: Option<FileWatcher>,
    last_poll: Instant,
    pending_open: Option<(Instant, Document)>,
    image: Option<PreviewImage>,
    zoom: f32,
    dot_available: bool,
}

impl AutomatonStudio {
    fn new(file: Option<PathBuf>) -> Self {
        let config = Config::load();
        let dot_available = DotRenderer::from_config(&config).is_available();
        if !dot_available {
            log::warn!("Graphviz `dot` not found; previews will show an error");
        }

        let pane = Rc::new(RefCell::new(PaneState::default()));
        let manager = SessionManager::new(EguiHost::new(pane.clone()), config);

        let mut app = Self {
            manager,
            pane,
            editor: None,
            watcher: None,
            last_poll: Instant::now(),
            pending_open: None,
            image: None,
            zoom: 1.0,
            dot_available,
        };

        match file {
            Some(path) => app.open_file(&path),
            None => app.new_file(),
        }
        app
    }

    fn notify_error(&mut self, message: String) {
        self.manager.host_mut().notify(Notification::error(message));
    }

    fn new_file(&mut self) {
        let path = std::env::current_dir()
            .unwrap_or_default()
            .join("untitled.auto");
        let editor = Editor::new(path, SAMPLE.to_string(), true);
        self.pending_open = Some((Instant::now() + OPEN_SETTLE_DELAY, editor.document()));
        self.editor = Some(editor);
        self.watcher = None;
    }

    fn open_file(&mut self, path: &Path) {
        match Document::open(path) {
            Ok(document) => {
                log::info!("Opened {:?}", path);
                self.editor = Some(Editor::new(document.path.clone(), document.text.clone(), false));
                self.watcher = watch_file(path);
                self.pending_open = Some((Instant::now() + OPEN_SETTLE_DELAY, document));
            }
            Err(e) => self.notify_error(format!("Failed to open {}: {}", path.display(), e)),
        }
    }

    fn pick_and_open(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Automata", &["auto", "dot", "gv"])
            .add_filter("Program charts", &["c", "cbl", "cobol", "pse", "pseudo"])
            .add_filter("All files", &["*"])
            .pick_file();
        if let Some(path) = picked {
            self.open_file(&path);
        }
    }

    fn save(&mut self) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };

        if editor.untitled {
            let Some(path) = rfd::FileDialog::new()
                .add_filter("Automata", &["auto", "dot"])
                .set_file_name(editor.name())
                .save_file()
            else {
                return;
            };
            editor.path = path;
            editor.untitled = false;
        }

        match std::fs::write(&editor.path, &editor.text) {
            Ok(()) => {
                log::info!("Saved {:?}", editor.path);
                editor.dirty = false;
                self.watcher = watch_file(&editor.path);
                let document = editor.document();
                // Saving may have given the document a new identity.
                self.manager
                    .handle(SessionEvent::ActiveDocumentChanged(Some(document)));
            }
            Err(e) => {
                let message = format!("Failed to save {}: {}", editor.path.display(), e);
                self.notify_error(message);
            }
        }
    }

    fn close_file(&mut self) {
        self.editor = None;
        self.watcher = None;
        self.pending_open = None;
        self.manager.handle(SessionEvent::ActiveDocumentChanged(None));
    }

    fn update_config(&mut self, change: impl FnOnce(&mut Config)) {
        let mut config = self.manager.config().clone();
        change(&mut config);
        if let Err(e) = config.save_to(&Config::default_path()) {
            log::warn!("{}", e);
            self.notify_error(e.to_string());
        }
        self.manager.handle(SessionEvent::ConfigurationChanged(config));
    }

    fn editor_changed(&mut self) {
        if let Some(editor) = &self.editor {
            self.manager
                .handle(SessionEvent::DocumentEdited(editor.document()));
        }
    }

    fn insert_symbol(&mut self, index: usize) {
        self.manager.host_mut().queued_pick = Some(index);
        self.manager.execute(Command::InsertSymbol);

        let Some(symbol) = self.manager.host_mut().pending_insert.take() else {
            return;
        };
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        editor.caret = insert_at(&mut editor.text, editor.caret, &symbol);
        editor.pending_caret = Some(editor.caret);
        editor.dirty = true;
        self.editor_changed();
    }

    /// Deliver the open once the settle delay has passed
    fn process_pending_open(&mut self, ctx: &egui::Context) {
        let Some((due, _)) = &self.pending_open else {
            return;
        };
        let now = Instant::now();
        if now < *due {
            ctx.request_repaint_after(*due - now);
            return;
        }

        if let Some((_, document)) = self.pending_open.take() {
            self.manager
                .handle(SessionEvent::ActiveDocumentChanged(Some(document.clone())));
            self.manager.handle(SessionEvent::DocumentOpened(document));
        }
    }

    fn poll_file(&mut self, ctx: &egui::Context) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        ctx.request_repaint_after(watcher.interval());
        if self.last_poll.elapsed() < watcher.interval() {
            return;
        }
        self.last_poll = Instant::now();

        match watcher.poll() {
            Some(WatchEvent::Modified(path)) => {
                let Some(editor) = self.editor.as_mut() else {
                    return;
                };
                if editor.dirty {
                    log::info!("{:?} changed on disk; keeping unsaved edits", path);
                    return;
                }
                match std::fs::read_to_string(&path) {
                    Ok(text) if text != editor.text => {
                        editor.caret = editor.caret.min(text.chars().count());
                        editor.text = text;
                        self.editor_changed();
                    }
                    Ok(_) => {}
                    Err(e) => log::warn!("Failed to reload {:?}: {}", path, e),
                }
            }
            Some(WatchEvent::Deleted(path)) => {
                self.manager
                    .host_mut()
                    .notify(Notification::info(format!("{} was deleted", path.display())));
            }
            None => {}
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let (open, save) = ctx.input_mut(|i| {
            (
                i.consume_key(egui::Modifiers::COMMAND, egui::Key::O),
                i.consume_key(egui::Modifiers::COMMAND, egui::Key::S),
            )
        });
        if open {
            self.pick_and_open();
        }
        if save {
            self.save();
        }
    }

    fn show_menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("New").clicked() {
                        self.new_file();
                        ui.close_menu();
                    }
                    if ui.button("Open... (Ctrl+O)").clicked() {
                        ui.close_menu();
                        self.pick_and_open();
                    }
                    if ui.button("Save (Ctrl+S)").clicked() {
                        ui.close_menu();
                        self.save();
                    }
                    if ui.button("Close").clicked() {
                        self.close_file();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Preview", |ui| {
                    if ui.button("Show Preview").clicked() {
                        self.manager.execute(Command::ShowPreview);
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button(self.manager.messages().copy_png()).clicked() {
                        ui.close_menu();
                        self.manager.execute(Command::CopyAsPng);
                    }
                    if ui.button(self.manager.messages().copy_svg()).clicked() {
                        ui.close_menu();
                        self.manager.execute(Command::CopyAsSvg);
                    }
                });

                ui.menu_button("Insert", |ui| {
                    ui.label(
                        RichText::new(self.manager.messages().pick_symbol_placeholder())
                            .weak()
                            .small(),
                    );
                    let choices = symbol_choices(self.manager.messages().locale());
                    for (index, choice) in choices.iter().enumerate() {
                        if ui.button(choice.label.as_str()).clicked() {
                            self.insert_symbol(index);
                            ui.close_menu();
                        }
                    }
                });

                ui.menu_button("Settings", |ui| self.show_settings_menu(ui));

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("Zoom: {:.0}%", self.zoom * 100.0));
                });
            });
        });
    }

    fn show_settings_menu(&mut self, ui: &mut egui::Ui) {
        let config = self.manager.config().clone();

        let mut decorations = config.symbol_decorations;
        if ui.checkbox(&mut decorations, "Symbol decorations").changed() {
            self.update_config(|c| c.symbol_decorations = decorations);
        }
        let mut auto_preview = config.auto_preview;
        if ui.checkbox(&mut auto_preview, "Open preview automatically").changed() {
            self.update_config(|c| c.auto_preview = auto_preview);
        }
        let mut charts = config.enable_program_chart_designer;
        if ui.checkbox(&mut charts, "Program chart designer").changed() {
            self.update_config(|c| c.enable_program_chart_designer = charts);
        }

        ui.separator();
        ui.label(RichText::new("Language").weak().small());
        for (locale, label) in [(Locale::En, "English"), (Locale::Es, "Español")] {
            if ui.radio(config.language == locale, label).clicked() {
                self.update_config(|c| c.language = locale);
            }
        }

        ui.separator();
        ui.label(RichText::new("Substitution").weak().small());
        for mode in [SubstitutionMode::Chained, SubstitutionMode::SinglePass] {
            if ui.radio(config.substitution_mode == mode, mode.as_str()).clicked() {
                self.update_config(|c| c.substitution_mode = mode);
            }
        }

        ui.separator();
        if ui.button("Reload config").clicked() {
            let config = Config::load();
            self.manager.handle(SessionEvent::ConfigurationChanged(config));
            ui.close_menu();
        }
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                match &self.editor {
                    Some(editor) => {
                        ui.label(editor.path.display().to_string());
                        if editor.dirty {
                            ui.label(RichText::new("● modified").color(Color32::YELLOW));
                        }
                    }
                    None => {
                        ui.label(RichText::new("No file").weak());
                    }
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if !self.dot_available {
                        ui.label(RichText::new("⚠ dot not found").color(ERROR_COLOR))
                            .on_hover_text("Install Graphviz or set dot_path in the config file");
                    }
                    ui.label(format!(
                        "{} symbols",
                        self.manager.symbol_table().len()
                    ));
                });
            });
        });
    }

    fn sync_image(&mut self, ctx: &egui::Context) {
        let pane = self.pane.borrow();
        if self.image.as_ref().map(|i| i.revision) == Some(pane.revision) {
            return;
        }

        if let Some(old) = self.image.take() {
            ctx.forget_image(&old.uri);
        }
        if let Some(svg) = pane.content.as_ref().and_then(|c| c.svg.as_ref()) {
            self.image = Some(PreviewImage {
                revision: pane.revision,
                uri: format!("bytes://automaton-preview-{}.svg", pane.revision),
                bytes: Arc::from(svg.as_bytes()),
            });
        }
    }

    fn show_preview_panel(&mut self, ctx: &egui::Context) {
        if !self.manager.is_open() {
            return;
        }
        self.sync_image(ctx);

        let messages = self.manager.messages();
        let (title, diagnostic) = {
            let pane = self.pane.borrow();
            let content = pane.content.as_ref();
            (
                content
                    .map(|c| c.title.clone())
                    .unwrap_or_else(|| messages.surface_placeholder_title().to_string()),
                content.and_then(|c| c.diagnostic.clone()),
            )
        };
        let mut action = None;

        egui::SidePanel::right("preview_panel")
            .resizable(true)
            .default_width(560.0)
            .min_width(280.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading(title.as_str());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("✕").on_hover_text("Close preview").clicked() {
                            action = Some(PreviewAction::Close);
                        }
                    });
                });

                ui.horizontal(|ui| {
                    if ui.button(messages.copy_png()).clicked() {
                        action = Some(PreviewAction::Message(SurfaceMessage::CopyAsPng));
                    }
                    if ui.button(messages.copy_svg()).clicked() {
                        action = Some(PreviewAction::Message(SurfaceMessage::CopyAsSvg));
                    }
                    ui.separator();
                    if ui.button("Zoom +").clicked() {
                        self.zoom += 0.1;
                    }
                    if ui.button("Zoom -").clicked() {
                        self.zoom = (self.zoom - 0.1).max(0.1);
                    }
                    if ui.button(messages.reset_zoom()).clicked() {
                        self.zoom = 1.0;
                    }
                });
                ui.separator();

                if let Some(diagnostic) = &diagnostic {
                    egui::Frame::none()
                        .fill(Color32::from_rgb(60, 20, 20))
                        .stroke(egui::Stroke::new(1.0, ERROR_COLOR))
                        .rounding(4.0)
                        .inner_margin(8.0)
                        .show(ui, |ui| {
                            ui.label(
                                RichText::new(messages.render_error_heading())
                                    .color(ERROR_COLOR)
                                    .strong(),
                            );
                            ui.label(RichText::new(diagnostic).monospace().color(ERROR_COLOR));
                            if self.image.is_none() {
                                ui.add_space(4.0);
                                ui.label(messages.render_error_hint());
                            }
                        });
                    ui.add_space(6.0);
                }

                match &self.image {
                    Some(image) => {
                        egui::ScrollArea::both().show(ui, |ui| {
                            ui.add(
                                egui::Image::from_bytes(
                                    image.uri.clone(),
                                    egui::load::Bytes::Shared(image.bytes.clone()),
                                )
                                .fit_to_original_size(self.zoom),
                            );
                        });
                    }
                    None if diagnostic.is_none() => {
                        ui.centered_and_justified(|ui| ui.spinner());
                    }
                    None => {}
                }
            });

        match action {
            Some(PreviewAction::Message(message)) => {
                self.manager
                    .handle(SessionEvent::MessageReceived(message.to_json()));
            }
            Some(PreviewAction::Close) => {
                self.manager.handle(SessionEvent::SurfaceDisposed);
                self.pane.borrow_mut().content = None;
            }
            None => {}
        }
    }

    fn show_editor(&mut self, ctx: &egui::Context) {
        let decorations = self.manager.host().decorations.clone();
        let mut changed = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(editor) = self.editor.as_mut() else {
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new("Open a .auto or .dot file (Ctrl+O)").weak());
                });
                return;
            };

            ui.horizontal(|ui| {
                ui.strong(editor.name());
                if editor.dirty {
                    ui.label(RichText::new("●").color(Color32::YELLOW));
                }
            });
            ui.separator();

            let mut layouter = |ui: &egui::Ui, text: &str, wrap_width: f32| {
                let job = highlight(ui, text, &decorations, wrap_width);
                ui.fonts(|f| f.layout_job(job))
            };

            egui::ScrollArea::vertical().show(ui, |ui| {
                let output = egui::TextEdit::multiline(&mut editor.text)
                    .code_editor()
                    .desired_width(f32::INFINITY)
                    .desired_rows(32)
                    .layouter(&mut layouter)
                    .show(ui);

                if let Some(range) = output.cursor_range {
                    editor.caret = range.primary.ccursor.index;
                }
                if let Some(caret) = editor.pending_caret.take() {
                    let mut state = output.state.clone();
                    state
                        .cursor
                        .set_char_range(Some(egui::text::CCursorRange::one(egui::text::CCursor::new(caret))));
                    state.store(ui.ctx(), output.response.id);
                }
                if output.response.changed() {
                    editor.dirty = true;
                    changed = true;
                }

                paint_decorations(ui, &output, &editor.text, &decorations);
            });
        });

        if changed {
            self.editor_changed();
        }
    }

    fn show_toasts(&mut self, ctx: &egui::Context) {
        let host = self.manager.host_mut();
        host.toasts.retain(|t| t.shown_at.elapsed() < TOAST_DURATION);
        if host.toasts.is_empty() {
            return;
        }

        egui::Area::new(egui::Id::new("toasts"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-12.0, -36.0])
            .show(ctx, |ui| {
                for toast in &host.toasts {
                    let color = match toast.notification.level {
                        NotificationLevel::Info => DECORATION_COLOR,
                        NotificationLevel::Error => ERROR_COLOR,
                    };
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.set_max_width(420.0);
                        ui.label(RichText::new(&toast.notification.message).color(color));
                    });
                }
            });
        ctx.request_repaint_after(Duration::from_millis(500));
    }
}

/// Editor text with escape sequences highlighted
fn highlight(
    ui: &egui::Ui,
    text: &str,
    decorations: &[SymbolDecoration],
    wrap_width: f32,
) -> egui::text::LayoutJob {
    let font = egui::TextStyle::Monospace.resolve(ui.style());
    let normal = egui::TextFormat::simple(font.clone(), ui.visuals().text_color());
    let escape = egui::TextFormat::simple(font, ESCAPE_COLOR);

    let mut job = egui::text::LayoutJob::default();
    job.wrap.max_width = wrap_width;

    let mut cursor = 0;
    for decoration in decorations {
        // Decorations from the previous frame may not fit the edited text.
        let Some(sequence) = text.get(decoration.range.clone()) else {
            continue;
        };
        if decoration.range.start < cursor {
            continue;
        }
        job.append(&text[cursor..decoration.range.start], 0.0, normal.clone());
        job.append(sequence, 0.0, escape.clone());
        cursor = decoration.range.end;
    }
    job.append(&text[cursor..], 0.0, normal);
    job
}

/// Draw each symbol just above the start of its escape sequence
fn paint_decorations(
    ui: &egui::Ui,
    output: &egui::widgets::text_edit::TextEditOutput,
    text: &str,
    decorations: &[SymbolDecoration],
) {
    let painter = ui.painter().with_clip_rect(output.text_clip_rect);
    for decoration in decorations {
        if text.get(decoration.range.clone()).is_none() {
            continue;
        }
        let index = text[..decoration.range.start].chars().count();
        let rect = output
            .galley
            .pos_from_ccursor(egui::text::CCursor::new(index));
        let pos = output.galley_pos + rect.min.to_vec2();
        painter.text(
            pos + egui::vec2(0.0, 1.0),
            egui::Align2::LEFT_BOTTOM,
            &decoration.symbol,
            FontId::proportional(10.0),
            DECORATION_COLOR,
        );
    }
}

impl eframe::App for AutomatonStudio {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_pending_open(ctx);
        self.poll_file(ctx);
        self.handle_shortcuts(ctx);

        self.show_menu_bar(ctx);
        self.show_status_bar(ctx);
        self.show_preview_panel(ctx);
        self.show_editor(ctx);
        self.show_toasts(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.manager.teardown();
    }
}
