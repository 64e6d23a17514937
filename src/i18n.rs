//! User-facing strings
//!
//! Everything the previewer shows to the user goes through [`Messages`] so the
//! `language` setting can switch between English and Spanish.

use serde::{Deserialize, Serialize};

/// Supported UI languages
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl Locale {
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
        }
    }

    pub fn messages(self) -> Messages {
        Messages { locale: self }
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Locale::En),
            "es" | "spanish" | "español" => Ok(Locale::Es),
            other => Err(format!("Unsupported language: {}", other)),
        }
    }
}

/// Localised message catalogue
#[derive(Debug, Clone, Copy)]
pub struct Messages {
    locale: Locale,
}

impl Messages {
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Surface title for a bound document
    pub fn preview_title(&self, name: &str) -> String {
        match self.locale {
            Locale::En => format!("Preview: {}", name),
            Locale::Es => format!("Vista previa: {}", name),
        }
    }

    pub fn surface_placeholder_title(&self) -> &'static str {
        "Automaton Automator Preview"
    }

    pub fn copied(&self, format: &str) -> String {
        match self.locale {
            Locale::En => format!("Automaton copied as {} to the clipboard.", format.to_uppercase()),
            Locale::Es => format!("Autómata copiado como {} al portapapeles.", format.to_uppercase()),
        }
    }

    pub fn clipboard_failed(&self) -> &'static str {
        match self.locale {
            Locale::En => "Could not copy the image to the clipboard. You can open the folder containing the generated file.",
            Locale::Es => "No se pudo copiar la imagen al portapapeles. Puedes abrir la carpeta que contiene el archivo generado.",
        }
    }

    pub fn reveal_option(&self) -> &'static str {
        match self.locale {
            Locale::En => "Show image in folder",
            Locale::Es => "Mostrar imagen en carpeta",
        }
    }

    pub fn export_failed(&self, format: &str, error: &str) -> String {
        match self.locale {
            Locale::En => format!("Error when creating {}: {}", format.to_uppercase(), error),
            Locale::Es => format!("Error al crear {}: {}", format.to_uppercase(), error),
        }
    }

    pub fn render_error_heading(&self) -> &'static str {
        match self.locale {
            Locale::En => "Couldn't generate your automaton",
            Locale::Es => "No se pudo generar tu autómata",
        }
    }

    pub fn render_error_hint(&self) -> &'static str {
        match self.locale {
            Locale::En => "Make sure to have Graphviz and DOT installed and in your PATH.",
            Locale::Es => "Asegúrate de tener Graphviz y DOT instalados y en tu PATH.",
        }
    }

    pub fn pick_symbol_placeholder(&self) -> &'static str {
        match self.locale {
            Locale::En => "Select a symbol to insert",
            Locale::Es => "Selecciona un símbolo para insertar",
        }
    }

    pub fn copy_png(&self) -> &'static str {
        match self.locale {
            Locale::En => "Copy as PNG",
            Locale::Es => "Copiar como PNG",
        }
    }

    pub fn copy_svg(&self) -> &'static str {
        match self.locale {
            Locale::En => "Copy as SVG",
            Locale::Es => "Copiar como SVG",
        }
    }

    pub fn reset_zoom(&self) -> &'static str {
        match self.locale {
            Locale::En => "Reset Zoom",
            Locale::Es => "Restablecer zoom",
        }
    }

    /// Label shown next to a pickable symbol
    pub fn symbol_name(&self, key: &str) -> &'static str {
        match (self.locale, key) {
            (_, "epsilon") => "epsilon",
            (_, "sigma") => "sigma",
            (Locale::En, "arrow") => "arrow",
            (Locale::Es, "arrow") => "flecha",
            (Locale::En, "union") => "union",
            (Locale::Es, "union") => "unión",
            (Locale::En, "intersection") => "intersection",
            (Locale::Es, "intersection") => "intersección",
            (Locale::En, "empty") => "empty set",
            (Locale::Es, "empty") => "conjunto vacío",
            (Locale::En, "space") => "space",
            (Locale::Es, "space") => "espacio",
            _ => "symbol",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_title_per_locale() {
        assert_eq!(Locale::En.messages().preview_title("a.dot"), "Preview: a.dot");
        assert_eq!(Locale::Es.messages().preview_title("a.dot"), "Vista previa: a.dot");
    }

    #[test]
    fn test_locale_parse() {
        assert_eq!("ES".parse::<Locale>().unwrap(), Locale::Es);
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn test_copied_uppercases_format() {
        assert!(Locale::En.messages().copied("png").contains("PNG"));
    }
}
