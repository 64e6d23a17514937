//! HTML preview surface
//!
//! Writes the preview as a standalone HTML page with zoom controls. Used by
//! the CLI's `watch` command; any browser can display the file. Copying is
//! left to `automaton-cli copy` since a browser page has no way back.

use crate::i18n::Messages;
use crate::surface::{PreviewContent, Surface};
use std::path::{Path, PathBuf};

/// Surface backed by an HTML file on disk
pub struct HtmlFileSurface {
    path: PathBuf,
    messages: Messages,
    open_on_reveal: bool,
    revealed: bool,
}

impl HtmlFileSurface {
    pub fn new(path: impl Into<PathBuf>, messages: Messages) -> Self {
        Self {
            path: path.into(),
            messages,
            open_on_reveal: false,
            revealed: false,
        }
    }

    /// Open the page in the default browser the first time it's revealed
    pub fn open_on_reveal(mut self, enabled: bool) -> Self {
        self.open_on_reveal = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Surface for HtmlFileSurface {
    fn present(&mut self, content: &PreviewContent) {
        let page = render_page(content, &self.messages);
        if let Err(e) = std::fs::write(&self.path, page) {
            log::warn!("Failed to write preview {:?}: {}", self.path, e);
        }
    }

    fn reveal(&mut self) {
        if self.open_on_reveal && !self.revealed {
            self.revealed = true;
            if let Err(e) = open::that(&self.path) {
                log::warn!("Failed to open preview {:?}: {}", self.path, e);
            }
        }
    }

    fn dispose(&mut self) {
        log::debug!("Preview surface {:?} disposed", self.path);
    }
}

/// Full page for `content`
pub fn render_page(content: &PreviewContent, messages: &Messages) -> String {
    let body = match (&content.svg, &content.diagnostic) {
        (Some(svg), None) => preview_body(svg, messages),
        (Some(svg), Some(diagnostic)) => format!(
            "{}\n{}",
            preview_body(svg, messages),
            diagnostic_overlay(diagnostic, messages)
        ),
        (None, Some(diagnostic)) => error_body(diagnostic, messages),
        (None, None) => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
{body}
<script>{SCRIPT}</script>
</body>
</html>
"#,
        lang = messages.locale().as_str(),
        title = escape(&content.title),
    )
}

fn preview_body(svg: &str, messages: &Messages) -> String {
    format!(
        r#"<div class="controls">
    <button id="zoomInBtn" type="button">Zoom +</button>
    <button id="zoomOutBtn" type="button">Zoom -</button>
    <button id="resetZoomBtn" type="button">{reset}</button>
</div>
<div class="svg-container" id="svgContainer">
{svg}
</div>"#,
        reset = messages.reset_zoom(),
    )
}

fn diagnostic_overlay(diagnostic: &str, messages: &Messages) -> String {
    format!(
        r#"<div class="diagnostic"><strong>{heading}</strong><pre>{message}</pre></div>"#,
        heading = messages.render_error_heading(),
        message = escape(diagnostic),
    )
}

fn error_body(diagnostic: &str, messages: &Messages) -> String {
    format!(
        r#"<div class="error">
    <h2>{heading}</h2>
    <pre>{message}</pre>
    <p>{hint}</p>
</div>"#,
        heading = messages.render_error_heading(),
        message = escape(diagnostic),
        hint = messages.render_error_hint(),
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const STYLE: &str = r#"
body { display: flex; flex-direction: column; align-items: center; padding: 20px;
       font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif;
       user-select: none; -webkit-user-select: none; }
.controls { margin-bottom: 20px; }
button { background-color: #007acc; color: white; border: none; padding: 8px 12px;
         border-radius: 3px; cursor: pointer; font-size: 14px; }
button:hover { background-color: #005999; }
.svg-container { border: 1px solid #ccc; padding: 10px; background-color: white; max-width: 100%; overflow: auto; }
.diagnostic { position: fixed; bottom: 12px; right: 12px; max-width: 40%; background: #fff4f4;
              border: 1px solid #d32f2f; color: #d32f2f; padding: 8px; border-radius: 3px; }
.error { color: #d32f2f; }
pre { background-color: #f5f5f5; padding: 10px; border-radius: 3px; overflow: auto; white-space: pre-wrap; }
"#;

const SCRIPT: &str = r#"
let scale = 1;
function updateZoom() {
    const svg = document.querySelector('svg');
    if (svg) { svg.style.transform = `scale(${scale})`; svg.style.transformOrigin = 'top left'; }
}
const zoom = (id, f) => { const b = document.getElementById(id); if (b) b.addEventListener('click', () => { f(); updateZoom(); }); };
zoom('zoomInBtn', () => { scale += 0.1; });
zoom('zoomOutBtn', () => { scale = Math.max(0.1, scale - 0.1); });
zoom('resetZoomBtn', () => { scale = 1; });
updateZoom();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Locale;

    #[test]
    fn test_preview_page_embeds_svg() {
        let content = PreviewContent::rendered("Preview: a.dot", "<svg id=\"g\"></svg>");
        let page = render_page(&content, &Locale::En.messages());

        assert!(page.contains("<svg id=\"g\"></svg>"));
        assert!(page.contains("<title>Preview: a.dot</title>"));
        assert!(page.contains("resetZoomBtn"));
        assert!(!page.contains("class=\"diagnostic\""));
    }

    #[test]
    fn test_standalone_page_has_no_copy_controls() {
        let content = PreviewContent::rendered("Preview: a.dot", "<svg/>");
        let page = render_page(&content, &Locale::En.messages());

        assert!(!page.contains("Copy as PNG"));
        assert!(!page.contains("data-command"));
        assert!(!page.contains("postMessage"));
    }

    #[test]
    fn test_failure_keeps_svg_with_overlay() {
        let content = PreviewContent::failed("t", Some("<svg/>".into()), "bad <token>");
        let page = render_page(&content, &Locale::Es.messages());

        assert!(page.contains("<svg/>"));
        assert!(page.contains("class=\"diagnostic\""));
        assert!(page.contains("bad &lt;token&gt;"));
        assert!(page.contains("lang=\"es\""));
    }

    #[test]
    fn test_error_page_without_previous_render() {
        let content = PreviewContent::failed("t", None, "dot: command not found");
        let page = render_page(&content, &Locale::En.messages());

        assert!(page.contains("Couldn't generate your automaton"));
        assert!(page.contains("Graphviz"));
        assert!(!page.contains("svgContainer"));
    }

    #[test]
    fn test_file_surface_writes_page() {
        let dir = tempfile::tempdir().unwrap();
        let mut surface = HtmlFileSurface::new(dir.path().join("preview.html"), Locale::En.messages());

        surface.present(&PreviewContent::rendered("Preview: x", "<svg/>"));
        let written = std::fs::read_to_string(surface.path()).unwrap();
        assert!(written.contains("<svg/>"));
    }
}
