//! Automaton Studio CLI - Render and preview automata from the terminal
//!
//! Renders `.auto`/`.dot` files through Graphviz after symbol substitution,
//! keeps an HTML preview in sync with a file, and copies images to the
//! clipboard.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::{style, Emoji};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use automaton_studio::config::Config;
use automaton_studio::convert::{self, ChartConverter, JavaChartConverter};
use automaton_studio::document::Document;
use automaton_studio::host::{Host, Notification, NotificationLevel};
use automaton_studio::html::HtmlFileSurface;
use automaton_studio::i18n::Messages;
use automaton_studio::preprocess::{preprocess_with, SubstitutionMode};
use automaton_studio::render::{DotRenderer, OutputFormat, RenderRequest, RenderedOutput, Renderer};
use automaton_studio::session::{SessionEvent, SessionManager};
use automaton_studio::surface::{PreviewContent, Surface};
use automaton_studio::symbols::symbol_choices;
use automaton_studio::tempfiles::{TempFiles, TEMP_DIR_NAME};
use automaton_studio::watch::{FileWatcher, WatchEvent};

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "+ ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");
static ARROW: Emoji<'_, '_> = Emoji("→ ", "-> ");
static INFO: Emoji<'_, '_> = Emoji("ℹ ", "i ");
static EYE: Emoji<'_, '_> = Emoji("👁 ", "* ");

#[derive(Parser)]
#[command(name = "automaton-cli")]
#[command(author = "e421")]
#[command(version = "0.3.0")]
#[command(about = "Automaton Studio CLI - Render automata written in DOT from the terminal")]
#[command(long_about = r#"
Automaton Studio CLI renders .auto and .dot files with Graphviz after
replacing escape sequences (\epsilon, \sigma, _1, ...) with their symbols.

Examples:
  automaton-cli render nfa.auto -o nfa.svg      # Render to a file
  automaton-cli render nfa.auto -f png --dpi 300 -o nfa.png
  automaton-cli preprocess nfa.auto             # Show the text sent to dot
  automaton-cli watch nfa.auto --open           # Live HTML preview
  automaton-cli copy nfa.auto                   # Copy as PNG to the clipboard
  automaton-cli config set language es          # Switch to Spanish
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Use a specific config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Answer prompts with the first choice
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a file with Graphviz
    Render {
        /// Source file (.auto, .dot, or a program source with the chart designer enabled)
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (svg, png)
        #[arg(short, long, default_value = "svg")]
        format: OutputFormat,

        /// DPI for raster output (overrides render_dpi)
        #[arg(long)]
        dpi: Option<u32>,
    },

    /// Print the text that would be sent to the renderer
    Preprocess {
        /// Source file
        file: PathBuf,

        /// Substitution mode (chained, single-pass)
        #[arg(short, long)]
        mode: Option<SubstitutionMode>,
    },

    /// Render a file and copy the image to the clipboard
    Copy {
        /// Source file
        file: PathBuf,

        /// Image format (png, svg)
        #[arg(short, long, default_value = "png")]
        format: OutputFormat,

        /// Also keep a copy of the image at this path
        #[arg(short, long)]
        save_to: Option<PathBuf>,
    },

    /// List the escape sequences and their symbols
    Symbols {
        /// Show the insert-symbol picklist instead
        #[arg(short, long)]
        picklist: bool,
    },

    /// Keep an HTML preview in sync with a file
    Watch {
        /// Source file
        file: PathBuf,

        /// Preview page path (default: <tmp>/automaton-automator/preview.html)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Open the preview in the default browser
        #[arg(long)]
        open: bool,

        /// Render once and exit
        #[arg(long)]
        once: bool,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Read one setting
    Get { key: String },
    /// Change one setting and save
    Set { key: String, value: String },
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config_file = cli.config.as_deref();

    match cli.command {
        Commands::Render {
            file,
            output,
            format,
            dpi,
        } => cmd_render(&load_config(config_file)?, &file, output.as_deref(), format, dpi),
        Commands::Preprocess { file, mode } => cmd_preprocess(&load_config(config_file)?, &file, mode),
        Commands::Copy {
            file,
            format,
            save_to,
        } => cmd_copy(load_config(config_file)?, &file, format, save_to.as_deref(), cli.yes),
        Commands::Symbols { picklist } => cmd_symbols(&load_config(config_file)?, picklist),
        Commands::Watch {
            file,
            output,
            open,
            once,
        } => cmd_watch(load_config(config_file)?, &file, output, open, once, cli.yes),
        Commands::Config { action } => {
            let path = config_file.map(Path::to_path_buf).unwrap_or_else(Config::default_path);
            cmd_config(&path, action)
        }
    }
}

/// Strict load for an explicit `--config`, lenient for the default file
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(Config::load()),
    }
}

fn open_document(file: &Path) -> Result<Document> {
    Document::open(file).with_context(|| format!("Failed to read {}", file.display()))
}

/// Chart conversion plus symbol substitution
fn dot_source(config: &Config, document: &Document, temp_files: &mut TempFiles) -> Result<String> {
    let java = JavaChartConverter::from_config(config);
    let converter = config
        .enable_program_chart_designer
        .then_some(&java as &dyn ChartConverter);
    let source = convert::source_for(document, converter, temp_files)
        .with_context(|| format!("Failed to convert {}", document.path.display()))?;
    Ok(preprocess_with(&source, &config.symbol_table(), config.substitution_mode))
}

/// Render a file to stdout or a file
fn cmd_render(
    config: &Config,
    file: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    dpi: Option<u32>,
) -> Result<()> {
    let document = open_document(file)?;
    let mut temp_files = TempFiles::new();
    let text = dot_source(config, &document, &mut temp_files);
    temp_files.cleanup();
    let text = text?;

    let renderer = DotRenderer::from_config(config);
    let request = RenderRequest::new(text, format).with_dpi(dpi.or(config.dpi()));

    match output {
        Some(path) => {
            renderer
                .render_to_file(&request, path)
                .with_context(|| format!("Failed to render {}", file.display()))?;
            eprintln!(
                "  {} Wrote {} {}",
                CHECK,
                style(format.as_str().to_uppercase()).cyan(),
                style(path.display()).white().bold()
            );
        }
        None => {
            let rendered = renderer
                .render(&request)
                .with_context(|| format!("Failed to render {}", file.display()))?;
            let mut stdout = io::stdout().lock();
            match rendered {
                RenderedOutput::Svg(svg) => stdout.write_all(svg.as_bytes())?,
                RenderedOutput::Image(bytes) => stdout.write_all(&bytes)?,
            }
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Print the preprocessed text
fn cmd_preprocess(config: &Config, file: &Path, mode: Option<SubstitutionMode>) -> Result<()> {
    let document = open_document(file)?;
    let mut config = config.clone();
    if let Some(mode) = mode {
        config.substitution_mode = mode;
    }

    let mut temp_files = TempFiles::new();
    let text = dot_source(&config, &document, &mut temp_files);
    temp_files.cleanup();
    println!("{}", text?);
    Ok(())
}

/// Export through the session so notifications and the reveal prompt apply
fn cmd_copy(
    config: Config,
    file: &Path,
    format: OutputFormat,
    save_to: Option<&Path>,
    assume_yes: bool,
) -> Result<()> {
    let document = open_document(file)?;
    let host = TerminalHost::new(config.language.messages(), assume_yes);
    let mut manager = SessionManager::new(host, config);

    if !manager.is_supported(&document) {
        eprintln!(
            "  {} {} is not a .auto/.dot file; rendering anyway",
            INFO,
            style(file.display()).yellow()
        );
    }

    let exported = manager.copy_as(&document, format);
    let result = match (&exported, save_to) {
        (Some(outcome), Some(target)) => std::fs::copy(outcome.path(), target)
            .map(|_| println!("  {} Saved {}", ARROW, style(target.display()).white().bold()))
            .with_context(|| format!("Failed to save image to {}", target.display())),
        (Some(_), None) => Ok(()),
        (None, _) => Err(anyhow::anyhow!("Export failed")),
    };

    if let Some(outcome) = &exported {
        if manager.retain_export(outcome) {
            println!(
                "  {} Kept {}",
                INFO,
                style(outcome.path().display()).white().bold()
            );
        }
    }

    manager.teardown();
    result
}

/// List symbols
fn cmd_symbols(config: &Config, picklist: bool) -> Result<()> {
    if picklist {
        println!("\n{}", style("Insert Symbol").bold().underlined());
        println!();
        for (i, choice) in symbol_choices(config.language).iter().enumerate() {
            println!("  {} {}", style(format!("{:>2}.", i + 1)).dim(), choice.label);
        }
        println!();
        return Ok(());
    }

    println!("\n{}", style("Escape Sequences").bold().underlined());
    println!();
    let table = config.symbol_table();
    for entry in table.iter() {
        let user = config.symbol_mappings.contains_key(entry.sequence());
        println!(
            "  {:<14} {} {}{}",
            style(entry.sequence()).cyan(),
            ARROW,
            style(printable(entry.replacement())).white().bold(),
            if user {
                style(" [user]").green().dim()
            } else {
                style("").dim()
            }
        );
    }
    println!();
    println!(
        "  {} Substitution runs in this order ({})",
        INFO,
        config.substitution_mode.as_str()
    );
    println!();
    Ok(())
}

fn printable(replacement: &str) -> String {
    match replacement {
        "\t" => "<tab>".to_string(),
        other => other.to_string(),
    }
}

/// Live HTML preview
fn cmd_watch(
    config: Config,
    file: &Path,
    output: Option<PathBuf>,
    open: bool,
    once: bool,
    assume_yes: bool,
) -> Result<()> {
    let page = output.unwrap_or_else(|| std::env::temp_dir().join(TEMP_DIR_NAME).join("preview.html"));
    if let Some(parent) = page.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let document = open_document(file)?;
    let host = TerminalHost::new(config.language.messages(), assume_yes).with_surface(page.clone(), open);
    let mut manager = SessionManager::new(host, config);
    if !manager.is_supported(&document) {
        bail!(
            "{} is not a supported file (.auto, .dot)",
            file.display()
        );
    }

    manager.handle(SessionEvent::ActiveDocumentChanged(Some(document.clone())));
    if !manager.is_open() {
        manager.show_preview(document);
    }
    println!(
        "  {} Preview: {}",
        EYE,
        style(page.display()).white().bold()
    );

    if once {
        manager.teardown();
        return Ok(());
    }

    println!("  {} Watching {} (Ctrl+C to stop)", INFO, style(file.display()).cyan());
    let mut watcher = FileWatcher::new(file)
        .with_context(|| format!("Failed to watch {}", file.display()))?;
    loop {
        std::thread::sleep(watcher.interval());
        match watcher.poll() {
            Some(WatchEvent::Modified(_)) => {
                let document = open_document(file)?;
                manager.handle(SessionEvent::DocumentEdited(document));
                println!(
                    "  {} {} updated",
                    CHECK,
                    style(chrono::Local::now().format("%H:%M:%S")).dim()
                );
            }
            Some(WatchEvent::Deleted(path)) => {
                println!("  {} {} was removed, stopping", CROSS, style(path.display()).yellow());
                manager.handle(SessionEvent::ActiveDocumentChanged(None));
                break;
            }
            None => {}
        }
    }

    manager.teardown();
    Ok(())
}

/// Show, get or set configuration
fn cmd_config(path: &Path, action: ConfigAction) -> Result<()> {
    let mut config = if path.exists() {
        Config::load_from(path).with_context(|| format!("Failed to load config {}", path.display()))?
    } else {
        Config::default()
    };

    match action {
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(&config).context("Failed to serialize config")?);
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Get { key } => println!("{}", config.get(&key)?),
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save_to(path)?;
            println!(
                "  {} {} = {}",
                CHECK,
                style(&key).cyan(),
                style(config.get(&key)?).white().bold()
            );
        }
    }
    Ok(())
}

/// Terminal front end for the session: HTML surfaces, stdin prompts
struct TerminalHost {
    messages: Messages,
    assume_yes: bool,
    surface: Option<(PathBuf, bool)>,
}

impl TerminalHost {
    fn new(messages: Messages, assume_yes: bool) -> Self {
        Self {
            messages,
            assume_yes,
            surface: None,
        }
    }

    /// Preview pages go to `page`, optionally opened in the browser
    fn with_surface(mut self, page: PathBuf, open: bool) -> Self {
        self.surface = Some((page, open));
        self
    }

    fn read_choice(&self, count: usize) -> Option<usize> {
        if self.assume_yes {
            return Some(0);
        }
        if !console::user_attended() {
            log::warn!("No terminal available for prompt, dismissing");
            return None;
        }

        print!("  Choose [1-{}, Enter to skip]: ", count);
        io::stdout().flush().ok()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input).ok()?;
        input
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=count).contains(n))
            .map(|n| n - 1)
    }
}

impl Host for TerminalHost {
    fn create_surface(&mut self) -> Box<dyn Surface> {
        let (page, open) = self.surface.clone().unwrap_or_else(|| {
            (
                std::env::temp_dir().join(TEMP_DIR_NAME).join("preview.html"),
                false,
            )
        });
        Box::new(ConsoleSurface {
            inner: HtmlFileSurface::new(page, self.messages).open_on_reveal(open),
        })
    }

    fn notify(&mut self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info => {
                println!("  {} {}", CHECK, style(&notification.message).green())
            }
            NotificationLevel::Error => {
                eprintln!("  {} {}", CROSS, style(&notification.message).red())
            }
        }
    }

    fn pick(&mut self, placeholder: &str, items: &[String]) -> Option<usize> {
        println!("\n  {}", style(placeholder).bold());
        for (i, item) in items.iter().enumerate() {
            println!("  {} {}", style(format!("{:>2}.", i + 1)).dim(), item);
        }
        self.read_choice(items.len())
    }

    fn prompt(&mut self, message: &str, choices: &[&str]) -> Option<usize> {
        println!("\n  {} {}", INFO, style(message).yellow());
        for (i, choice) in choices.iter().enumerate() {
            println!("  {} {}", style(format!("{:>2}.", i + 1)).dim(), choice);
        }
        self.read_choice(choices.len())
    }
}

/// HTML preview that also reports diagnostics on stderr
struct ConsoleSurface {
    inner: HtmlFileSurface,
}

impl Surface for ConsoleSurface {
    fn present(&mut self, content: &PreviewContent) {
        self.inner.present(content);
        if let Some(diagnostic) = &content.diagnostic {
            eprintln!("  {} {}", CROSS, style(diagnostic.trim()).red());
        }
    }

    fn reveal(&mut self) {
        self.inner.reveal();
    }

    fn dispose(&mut self) {
        self.inner.dispose();
    }
}
