//! Graphviz renderer adapter
//!
//! Layout is delegated to the external `dot` binary. Source text goes in on
//! stdin; SVG comes back on stdout, raster exports are written with `-o`.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Output formats requested from the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Vector text, used by the preview surface and SVG export
    Svg,
    /// Raster image, used by PNG export
    Png,
}

impl OutputFormat {
    /// `-T` argument / file extension
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
        }
    }

    pub fn is_raster(&self) -> bool {
        matches!(self, OutputFormat::Png)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "svg" => Ok(OutputFormat::Svg),
            "png" => Ok(OutputFormat::Png),
            other => Err(format!("Unsupported format: {} (expected svg or png)", other)),
        }
    }
}

/// What to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub text: String,
    pub format: OutputFormat,
    pub dpi: Option<u32>,
}

impl RenderRequest {
    pub fn new(text: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            text: text.into(),
            format,
            dpi: None,
        }
    }

    /// Preview surface request
    pub fn preview(text: impl Into<String>) -> Self {
        Self::new(text, OutputFormat::Svg)
    }

    pub fn with_dpi(mut self, dpi: Option<u32>) -> Self {
        self.dpi = dpi.filter(|d| *d > 0);
        self
    }
}

/// Rendered content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedOutput {
    Svg(String),
    Image(Vec<u8>),
}

impl RenderedOutput {
    pub fn as_svg(&self) -> Option<&str> {
        match self {
            RenderedOutput::Svg(svg) => Some(svg),
            RenderedOutput::Image(_) => None,
        }
    }

    pub fn into_svg(self) -> Option<String> {
        match self {
            RenderedOutput::Svg(svg) => Some(svg),
            RenderedOutput::Image(_) => None,
        }
    }
}

/// Renderer failures
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The tool could not be started
    #[error("Could not run {program}: {source}")]
    ToolMissing {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The tool rejected the input; carries its diagnostic verbatim
    #[error("{0}")]
    Rejected(String),
    #[error("Renderer output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },
    #[error("Renderer produced invalid UTF-8 SVG")]
    InvalidUtf8,
    #[error("Renderer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Contract of the external layout tool
pub trait Renderer {
    /// Render into memory (SVG text or image bytes)
    fn render(&self, request: &RenderRequest) -> Result<RenderedOutput, RenderError>;

    /// Render into a named output file
    fn render_to_file(&self, request: &RenderRequest, output: &Path) -> Result<(), RenderError>;
}

/// Renderer backed by the Graphviz `dot` executable
#[derive(Debug, Clone)]
pub struct DotRenderer {
    program: PathBuf,
    max_output_bytes: usize,
}

impl DotRenderer {
    /// Default output limit (10 MiB)
    pub const DEFAULT_MAX_OUTPUT: usize = 10 * 1024 * 1024;

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            max_output_bytes: Self::DEFAULT_MAX_OUTPUT,
        }
    }

    /// Locate `dot` on PATH, falling back to the bare name
    pub fn locate() -> Self {
        let program = which::which("dot").unwrap_or_else(|_| PathBuf::from("dot"));
        Self::new(program)
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        let renderer = match &config.dot_path {
            Some(path) => Self::new(path),
            None => Self::locate(),
        };
        renderer.with_max_output(config.render_buffer_bytes())
    }

    pub fn with_max_output(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Whether the tool answers `-V`
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-V")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn format_args(request: &RenderRequest) -> Vec<String> {
        let mut args = vec![format!("-T{}", request.format.as_str())];
        if request.format.is_raster() {
            if let Some(dpi) = request.dpi {
                args.push(format!("-Gdpi={}", dpi));
            }
        }
        args
    }

    fn run(&self, args: &[String], input: &str) -> Result<Vec<u8>, RenderError> {
        log::debug!("Running {:?} {:?}", self.program, args);
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RenderError::ToolMissing {
                program: self.program.display().to_string(),
                source,
            })?;

        run_with_input(child, input, self.max_output_bytes)
    }
}

impl Default for DotRenderer {
    fn default() -> Self {
        Self::locate()
    }
}

impl Renderer for DotRenderer {
    fn render(&self, request: &RenderRequest) -> Result<RenderedOutput, RenderError> {
        let stdout = self.run(&Self::format_args(request), &request.text)?;
        match request.format {
            OutputFormat::Svg => String::from_utf8(stdout)
                .map(RenderedOutput::Svg)
                .map_err(|_| RenderError::InvalidUtf8),
            OutputFormat::Png => Ok(RenderedOutput::Image(stdout)),
        }
    }

    fn render_to_file(&self, request: &RenderRequest, output: &Path) -> Result<(), RenderError> {
        let mut args = Self::format_args(request);
        args.push("-o".to_string());
        args.push(output.display().to_string());
        self.run(&args, &request.text)?;
        Ok(())
    }
}

/// Feed `input` to the child's stdin, collect stdout up to `limit` bytes.
///
/// stdin is written from a helper thread so a large graph can't deadlock
/// against a full stdout pipe.
pub(crate) fn run_with_input(mut child: Child, input: &str, limit: usize) -> Result<Vec<u8>, RenderError> {
    let writer = child.stdin.take().map(|mut stdin| {
        let input = input.to_owned();
        std::thread::spawn(move || {
            // The tool may exit early on bad input; its stderr explains why.
            let _ = stdin.write_all(input.as_bytes());
        })
    });

    let mut stderr_pipe = child.stderr.take();
    let stderr_reader = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(pipe) = stderr_pipe.as_mut() {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });

    let mut stdout = Vec::new();
    let mut too_large = false;
    if let Some(pipe) = child.stdout.take() {
        pipe.take(limit as u64 + 1).read_to_end(&mut stdout)?;
        if stdout.len() > limit {
            too_large = true;
            let _ = child.kill();
        }
    }

    let status = child.wait()?;
    if let Some(handle) = writer {
        let _ = handle.join();
    }
    let stderr = stderr_reader.join().unwrap_or_default();

    if too_large {
        return Err(RenderError::OutputTooLarge { limit });
    }

    if !status.success() {
        let diagnostic = String::from_utf8_lossy(&stderr).trim().to_string();
        let diagnostic = if diagnostic.is_empty() {
            format!("process exited with {}", status)
        } else {
            diagnostic
        };
        return Err(RenderError::Rejected(diagnostic));
    }

    Ok(stdout)
}
