//! Source documents
//!
//! A [`Document`] is the host's view of an open file: identity, path, language
//! id and current text. [`FileSupport`] decides which documents the previewer
//! acts on.

use crate::config::Config;
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque document identity (a URI string)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// `file://` identity for a path on disk
    pub fn from_path(path: &Path) -> Self {
        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        Self(format!("file://{}", absolute.display()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of an open document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub path: PathBuf,
    pub language_id: String,
    pub text: String,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: DocumentId::from_path(&path),
            language_id: language_for_path(&path).to_string(),
            path,
            text: text.into(),
        }
    }

    /// Read a document from disk
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let text = std::fs::read_to_string(&path)?;
        Ok(Self::new(path, text))
    }

    pub fn with_language(mut self, language_id: impl Into<String>) -> Self {
        self.language_id = language_id.into();
        self
    }

    /// File name shown in titles
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Lowercased extension including the dot (`.auto`)
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
    }

    /// Chart designer language, if this is a program source
    pub fn chart_language(&self) -> Option<ChartLanguage> {
        ChartLanguage::from_path(&self.path)
    }
}

/// Program languages the chart designer converts to DOT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartLanguage {
    C,
    Cobol,
    Pseudo,
}

impl ChartLanguage {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "c" => Some(ChartLanguage::C),
            "cbl" | "cobol" => Some(ChartLanguage::Cobol),
            "pse" | "pseudo" => Some(ChartLanguage::Pseudo),
            _ => None,
        }
    }

    /// Argument understood by the runner
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartLanguage::C => "c",
            ChartLanguage::Cobol => "cobol",
            ChartLanguage::Pseudo => "pseudo",
        }
    }
}

fn language_for_path(path: &Path) -> &'static str {
    if let Some(lang) = ChartLanguage::from_path(path) {
        return lang.as_str();
    }
    match path.extension().map(|e| e.to_string_lossy().to_lowercase()) {
        Some(ext) if ext == "dot" || ext == "gv" || ext == "auto" => "dot",
        _ => "plaintext",
    }
}

const GRAPH_EXTENSIONS: &[&str] = &[".auto", ".dot"];
const CHART_EXTENSIONS: &[&str] = &[".c", ".cbl", ".cobol", ".pse", ".pseudo"];
const GRAPH_LANGUAGES: &[&str] = &["dot"];
const CHART_LANGUAGES: &[&str] = &["c", "cobol", "pseudo"];

/// Which documents the previewer handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSupport {
    extensions: Vec<&'static str>,
    languages: Vec<&'static str>,
}

impl FileSupport {
    pub fn new(program_charts: bool) -> Self {
        let mut extensions = GRAPH_EXTENSIONS.to_vec();
        let mut languages = GRAPH_LANGUAGES.to_vec();
        if program_charts {
            extensions.extend_from_slice(CHART_EXTENSIONS);
            languages.extend_from_slice(CHART_LANGUAGES);
        }
        Self {
            extensions,
            languages,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.enable_program_chart_designer)
    }

    /// In scope by extension or by declared language id
    pub fn is_supported(&self, document: &Document) -> bool {
        let by_extension = document
            .extension()
            .is_some_and(|ext| self.extensions.contains(&ext.as_str()));
        by_extension || self.languages.contains(&document.language_id.as_str())
    }
}

impl Default for FileSupport {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_files_supported() {
        let support = FileSupport::default();
        assert!(support.is_supported(&Document::new("/tmp/a.auto", "")));
        assert!(support.is_supported(&Document::new("/tmp/b.DOT", "")));
        assert!(!support.is_supported(&Document::new("/tmp/c.txt", "")));
    }

    #[test]
    fn test_language_id_supported() {
        let support = FileSupport::default();
        let doc = Document::new("/tmp/untitled-1", "digraph {}").with_language("dot");
        assert!(support.is_supported(&doc));
    }

    #[test]
    fn test_chart_files_need_feature() {
        let doc = Document::new("/tmp/main.cbl", "");
        assert!(!FileSupport::new(false).is_supported(&doc));
        assert!(FileSupport::new(true).is_supported(&doc));
        assert_eq!(doc.chart_language(), Some(ChartLanguage::Cobol));
    }

    #[test]
    fn test_display_name() {
        let doc = Document::new("/work/automata/dfa.auto", "");
        assert_eq!(doc.display_name(), "dfa.auto");
        assert_eq!(doc.extension().as_deref(), Some(".auto"));
    }

    #[test]
    fn test_open_reads_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nfa.dot");
        std::fs::write(&path, "digraph { a -> b }").unwrap();

        let doc = Document::open(&path).unwrap();
        assert_eq!(doc.text, "digraph { a -> b }");
        assert_eq!(doc.language_id, "dot");
        assert_eq!(doc.id, DocumentId::from_path(&path));
    }
}
