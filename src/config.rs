//! Previewer Configuration
//!
//! Configuration can be loaded from:
//! - Default values
//! - Config file (~/.config/automaton-studio/config.toml)
//!
//! Values are captured once at startup. Hosts that watch the file send
//! `SessionEvent::ConfigurationChanged` with a freshly loaded [`Config`].

use crate::i18n::Locale;
use crate::preprocess::SubstitutionMode;
use crate::symbols::{build_symbol_table, SymbolTable, DEFAULT_SYMBOLS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the directory used under the config dir
const CONFIG_DIR_NAME: &str = "automaton-studio";

/// Previewer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Extra or overriding escape sequences (`"\\lambda" = "λ"`)
    pub symbol_mappings: BTreeMap<String, String>,

    /// Draw symbols in front of escape sequences in the editor
    pub symbol_decorations: bool,

    /// Accept C/COBOL/pseudocode files and convert them to DOT
    pub enable_program_chart_designer: bool,

    /// DPI for raster export (0 keeps Graphviz's default)
    pub render_dpi: u32,

    /// Largest accepted renderer/converter output, in MiB
    pub render_buffer_mb: u64,

    /// UI language
    pub language: Locale,

    /// Open the preview automatically when a supported document becomes active
    pub auto_preview: bool,

    /// How symbol substitution treats replacements
    pub substitution_mode: SubstitutionMode,

    /// Explicit path to the `dot` binary
    pub dot_path: Option<PathBuf>,

    /// Explicit path to the `java` binary used by the chart designer
    pub java_path: Option<PathBuf>,

    /// Classpath holding the chart designer runner
    pub program_chart_classpath: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbol_mappings: BTreeMap::new(),
            symbol_decorations: true,
            enable_program_chart_designer: false,
            render_dpi: 0,
            render_buffer_mb: 10,
            language: Locale::default(),
            auto_preview: true,
            substitution_mode: SubstitutionMode::default(),
            dot_path: None,
            java_path: None,
            program_chart_classpath: None,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Unknown config key: {0}")]
    UnknownKey(String),
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl Config {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join(CONFIG_DIR_NAME).join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Load configuration from the default file, falling back to defaults
    pub fn load() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                log::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                log::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Largest accepted tool output in bytes
    pub fn render_buffer_bytes(&self) -> usize {
        (self.render_buffer_mb.max(1) as usize).saturating_mul(1024 * 1024)
    }

    /// Built-in symbols merged with the user's mappings
    pub fn symbol_table(&self) -> SymbolTable {
        build_symbol_table(DEFAULT_SYMBOLS.iter().copied(), self.symbol_mappings.iter())
    }

    /// Raster DPI, if one was configured
    pub fn dpi(&self) -> Option<u32> {
        (self.render_dpi > 0).then_some(self.render_dpi)
    }

    /// Read a scalar setting as text
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "symbol_decorations" => self.symbol_decorations.to_string(),
            "enable_program_chart_designer" => self.enable_program_chart_designer.to_string(),
            "render_dpi" => self.render_dpi.to_string(),
            "render_buffer_mb" => self.render_buffer_mb.to_string(),
            "language" => self.language.as_str().to_string(),
            "auto_preview" => self.auto_preview.to_string(),
            "substitution_mode" => self.substitution_mode.as_str().to_string(),
            "dot_path" => display_opt(self.dot_path.as_deref()),
            "java_path" => display_opt(self.java_path.as_deref()),
            "program_chart_classpath" => self.program_chart_classpath.clone().unwrap_or_default(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// Update a scalar setting from text
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        match key {
            "symbol_decorations" => {
                self.symbol_decorations = value.parse().map_err(|e| invalid(format!("{}", e)))?
            }
            "enable_program_chart_designer" => {
                self.enable_program_chart_designer =
                    value.parse().map_err(|e| invalid(format!("{}", e)))?
            }
            "render_dpi" => self.render_dpi = value.parse().map_err(|e| invalid(format!("{}", e)))?,
            "render_buffer_mb" => {
                self.render_buffer_mb = value.parse().map_err(|e| invalid(format!("{}", e)))?
            }
            "language" => self.language = value.parse().map_err(invalid)?,
            "auto_preview" => {
                self.auto_preview = value.parse().map_err(|e| invalid(format!("{}", e)))?
            }
            "substitution_mode" => self.substitution_mode = value.parse().map_err(invalid)?,
            "dot_path" => self.dot_path = non_empty(value).map(PathBuf::from),
            "java_path" => self.java_path = non_empty(value).map(PathBuf::from),
            "program_chart_classpath" => {
                self.program_chart_classpath = non_empty(value).map(str::to_string)
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

fn display_opt(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.symbol_decorations);
        assert!(!config.enable_program_chart_designer);
        assert_eq!(config.render_buffer_mb, 10);
        assert_eq!(config.dpi(), None);
    }

    #[test]
    fn test_symbol_table_merges_user_mappings() {
        let mut config = Config::default();
        config.symbol_mappings.insert("\\epsilon".into(), "ϵ".into());
        config.symbol_mappings.insert("\\lambda".into(), "λ".into());

        let table = config.symbol_table();
        assert_eq!(table.get("\\epsilon"), Some("ϵ"));
        assert_eq!(table.get("\\lambda"), Some("λ"));
        assert_eq!(table.len(), DEFAULT_SYMBOLS.len() + 1);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            render_dpi = 300
            language = "es"

            [symbol_mappings]
            '\epsilon' = "ϵ"
            "#,
        )
        .unwrap();

        assert_eq!(config.dpi(), Some(300));
        assert_eq!(config.language, Locale::Es);
        assert_eq!(config.symbol_mappings.get("\\epsilon").map(String::as_str), Some("ϵ"));
        assert!(config.auto_preview);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.set("render_dpi", "150").unwrap();
        config.set("substitution_mode", "single-pass").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.substitution_mode, SubstitutionMode::SinglePass);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "render_dpi = \"lots\"").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_unknown_key() {
        let mut config = Config::default();
        assert!(matches!(config.set("theme", "dark"), Err(ConfigError::UnknownKey(_))));
        assert!(config.get("theme").is_err());
    }

    #[test]
    fn test_render_buffer_bytes() {
        let config = Config::default();
        assert_eq!(config.render_buffer_bytes(), 10 * 1024 * 1024);
    }
}
