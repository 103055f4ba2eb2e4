//! Localized chat strings.
//!
//! Locale tables are flat JSON objects of `key → template`. Templates use
//! `{NAME}` placeholders. English and Russian are compiled in; a locale
//! directory may add languages or override individual keys.

use std::collections::HashMap;
use std::path::Path;

use legionbot_core::error::ConfigError;
use tracing::{debug, warn};

const BUILTIN: [(&str, &str); 2] = [
    ("en", include_str!("../locales/en.json")),
    ("ru", include_str!("../locales/ru.json")),
];

const FALLBACK_LANGUAGE: &str = "en";

/// String lookup by language and key.
pub trait Localizer: Send + Sync {
    /// Renders `key` in `lang`, substituting `{NAME}` placeholders.
    ///
    /// Unknown languages fall back to English; unknown keys render as the
    /// key itself.
    fn get(&self, lang: &str, key: &str, args: &[(&str, &str)]) -> String;
}

/// In-memory locale tables.
#[derive(Debug, Clone, Default)]
pub struct Locales {
    tables: HashMap<String, HashMap<String, String>>,
}

impl Locales {
    /// Built-in tables only.
    #[must_use]
    pub fn builtin() -> Self {
        let mut locales = Self::default();
        for (lang, raw) in BUILTIN {
            match serde_json::from_str::<HashMap<String, String>>(raw) {
                Ok(table) => {
                    locales.tables.insert(lang.to_string(), table);
                }
                Err(e) => warn!(lang, error = %e, "built-in locale table is invalid"),
            }
        }
        locales
    }

    /// Built-in tables overlaid with every `<lang>.json` in `dir`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the directory or a file in it cannot be
    /// read or parsed.
    pub fn with_overrides(dir: &Path) -> Result<Self, ConfigError> {
        let mut locales = Self::builtin();
        let entries = std::fs::read_dir(dir).map_err(|_| ConfigError::MissingFile {
            path: dir.to_path_buf(),
        })?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = std::fs::read_to_string(&path).map_err(|_| ConfigError::MissingFile {
                path: path.clone(),
            })?;
            let table: HashMap<String, String> =
                serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError {
                    path: path.clone(),
                    line: Some(e.line()),
                    message: e.to_string(),
                })?;
            debug!(lang, keys = table.len(), "loaded locale overrides");
            locales
                .tables
                .entry(lang.to_string())
                .or_default()
                .extend(table);
        }
        Ok(locales)
    }

    /// Languages with a table.
    #[must_use]
    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<_> = self.tables.keys().map(String::as_str).collect();
        langs.sort_unstable();
        langs
    }
}

impl Localizer for Locales {
    fn get(&self, lang: &str, key: &str, args: &[(&str, &str)]) -> String {
        let template = self
            .tables
            .get(lang)
            .and_then(|t| t.get(key))
            .or_else(|| {
                self.tables
                    .get(FALLBACK_LANGUAGE)
                    .and_then(|t| t.get(key))
            });

        let Some(template) = template else {
            warn!(lang, key, "missing locale key");
            return key.to_string();
        };

        args.iter()
            .fold(template.clone(), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), value)
            })
    }
}
