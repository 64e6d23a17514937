//! Program chart conversion
//!
//! With the chart designer enabled, C, COBOL and pseudocode sources are turned
//! into DOT by an external Java runner before preprocessing. Everything else
//! passes through untouched.

use crate::config::Config;
use crate::document::{ChartLanguage, Document};
use crate::render::run_with_input;
use crate::tempfiles::TempFiles;
use std::borrow::Cow;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Main class of the chart designer runner
pub const RUNNER_CLASS: &str = "ProgramChartDesigner.App.Runner";

/// Chart conversion failures
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("The chart designer returned no DOT content.")]
    EmptyOutput,
    #[error("Error converting the file to DOT: {0}")]
    Failed(String),
    #[error("Chart designer classpath is not configured")]
    MissingClasspath,
    #[error("Could not stage source for conversion: {0}")]
    Io(#[from] std::io::Error),
}

/// Source-to-DOT conversion step
pub trait ChartConverter {
    fn convert(
        &self,
        language: ChartLanguage,
        document: &Document,
        temp_files: &mut TempFiles,
    ) -> Result<String, ConversionError>;
}

/// Runs `java -cp <classpath> ProgramChartDesigner.App.Runner <lang> <file> --stdout`
#[derive(Debug, Clone)]
pub struct JavaChartConverter {
    java: PathBuf,
    classpath: Option<String>,
    max_output_bytes: usize,
}

impl JavaChartConverter {
    pub fn new(java: impl Into<PathBuf>, classpath: Option<String>) -> Self {
        Self {
            java: java.into(),
            classpath,
            max_output_bytes: crate::render::DotRenderer::DEFAULT_MAX_OUTPUT,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let java = config
            .java_path
            .clone()
            .or_else(|| which::which("java").ok())
            .unwrap_or_else(|| PathBuf::from("java"));
        Self {
            java,
            classpath: config.program_chart_classpath.clone(),
            max_output_bytes: config.render_buffer_bytes(),
        }
    }
}

impl ChartConverter for JavaChartConverter {
    fn convert(
        &self,
        language: ChartLanguage,
        document: &Document,
        temp_files: &mut TempFiles,
    ) -> Result<String, ConversionError> {
        let classpath = self.classpath.as_deref().ok_or(ConversionError::MissingClasspath)?;

        let ext = document
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| language.as_str().to_string());
        let source = temp_files.fresh_path("automaton-tmp", &ext)?;
        std::fs::write(&source, &document.text)?;
        temp_files.track(&source);

        log::debug!("Converting {:?} as {}", document.path, language.as_str());
        let child = Command::new(&self.java)
            .arg("-cp")
            .arg(classpath)
            .arg(RUNNER_CLASS)
            .arg(language.as_str())
            .arg(&source)
            .arg("--stdout")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ConversionError::Failed(format!("{}: {}", self.java.display(), e)))?;

        let stdout = run_with_input(child, "", self.max_output_bytes)
            .map_err(|e| ConversionError::Failed(e.to_string()))?;
        let dot = String::from_utf8_lossy(&stdout).to_string();
        if dot.trim().is_empty() {
            return Err(ConversionError::EmptyOutput);
        }
        Ok(dot)
    }
}

/// DOT source for a document: converted when it is a chart source and the
/// designer is enabled, otherwise the document text itself
pub fn source_for<'a>(
    document: &'a Document,
    converter: Option<&dyn ChartConverter>,
    temp_files: &mut TempFiles,
) -> Result<Cow<'a, str>, ConversionError> {
    match (document.chart_language(), converter) {
        (Some(language), Some(converter)) => {
            converter.convert(language, document, temp_files).map(Cow::Owned)
        }
        _ => Ok(Cow::Borrowed(&document.text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedConverter(&'static str);

    impl ChartConverter for FixedConverter {
        fn convert(
            &self,
            _language: ChartLanguage,
            _document: &Document,
            _temp_files: &mut TempFiles,
        ) -> Result<String, ConversionError> {
            if self.0.is_empty() {
                Err(ConversionError::EmptyOutput)
            } else {
                Ok(self.0.to_string())
            }
        }
    }

    #[test]
    fn test_graph_documents_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let mut temp = TempFiles::in_dir(dir.path());
        let doc = Document::new("/tmp/a.auto", "digraph { a -> b }");

        let source = source_for(&doc, Some(&FixedConverter("digraph {}")), &mut temp).unwrap();
        assert!(matches!(source, Cow::Borrowed(_)));
        assert_eq!(source, "digraph { a -> b }");
    }

    #[test]
    fn test_chart_documents_are_converted() {
        let dir = tempfile::tempdir().unwrap();
        let mut temp = TempFiles::in_dir(dir.path());
        let doc = Document::new("/tmp/main.c", "int main() { return 0; }");

        let source = source_for(&doc, Some(&FixedConverter("digraph { start }")), &mut temp).unwrap();
        assert_eq!(source, "digraph { start }");

        // Without a converter the text is used as-is.
        let source = source_for(&doc, None, &mut temp).unwrap();
        assert_eq!(source, "int main() { return 0; }");
    }

    #[test]
    fn test_empty_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut temp = TempFiles::in_dir(dir.path());
        let doc = Document::new("/tmp/algo.pse", "INICIO FIN");

        let err = source_for(&doc, Some(&FixedConverter("")), &mut temp).unwrap_err();
        assert!(matches!(err, ConversionError::EmptyOutput));
    }

    #[test]
    fn test_missing_classpath() {
        let dir = tempfile::tempdir().unwrap();
        let mut temp = TempFiles::in_dir(dir.path());
        let doc = Document::new("/tmp/main.c", "int main;");

        let converter = JavaChartConverter::new("java", None);
        let err = converter.convert(ChartLanguage::C, &doc, &mut temp).unwrap_err();
        assert!(matches!(err, ConversionError::MissingClasspath));
        assert!(temp.tracked().is_empty());
    }

    #[test]
    fn test_missing_java_reports_failure_and_tracks_staged_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut temp = TempFiles::in_dir(dir.path());
        let doc = Document::new("/tmp/main.c", "int main;");

        let converter =
            JavaChartConverter::new("/nonexistent/automaton-studio/java", Some("lib/*".into()));
        let err = converter.convert(ChartLanguage::C, &doc, &mut temp).unwrap_err();

        assert!(matches!(err, ConversionError::Failed(_)));
        assert_eq!(temp.tracked().len(), 1);
        temp.cleanup();
    }
}
