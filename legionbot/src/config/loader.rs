//! Configuration loader.
//!
//! Pipeline:
//! 1. Size check and read
//! 2. Environment variable expansion (on raw text, before parsing)
//! 3. YAML parsing
//! 4. Deserialization to [`BotConfig`]
//! 5. Validation
//! 6. Freeze with `Arc`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use legionbot_core::error::ConfigError;
use serde_yaml::Value;

use super::schema::BotConfig;
use super::validation::Validator;

/// Largest accepted configuration file.
const MAX_CONFIG_SIZE: u64 = 1024 * 1024;

// ============================================================================
// Public API
// ============================================================================

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    pub config: Arc<BotConfig>,
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    pub message: String,
    pub location: Option<String>,
}

/// Loads and validates YAML configuration files.
#[derive(Debug, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Loads `path` and returns the frozen configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or is too large
    /// - A required environment variable is missing
    /// - YAML parsing or deserialization fails
    /// - Validation finds errors
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        if metadata.len() > MAX_CONFIG_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{} bytes", metadata.len()),
                expected: format!("at most {MAX_CONFIG_SIZE} bytes"),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        self.load_str(&raw, path)
    }

    /// Runs the pipeline on already-read text; `path` is used for messages.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigLoader::load`], minus file access.
    pub fn load_str(&self, raw: &str, path: &Path) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        // Stage 1: environment substitution
        let mut env_sub = EnvSubstitution::new();
        let substituted = env_sub
            .substitute(raw, path)
            .map_err(|e| with_path(e, path))?;
        warnings.extend(env_sub.warnings);

        // Stage 2: YAML parsing
        let root: Value = serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;
        if root.is_null() {
            return Err(ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: "Configuration file is empty".to_string(),
            });
        }

        // Stage 3: typed config
        let config: BotConfig =
            serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: format!("Failed to deserialize configuration: {e}"),
            })?;

        // Stage 4: validation
        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result.errors,
            });
        }
        warnings.extend(result.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

/// Fills in the file path on parse errors raised before it was known.
fn with_path(error: ConfigError, path: &Path) -> ConfigError {
    match error {
        ConfigError::ParseError {
            path: p,
            line,
            message,
        } if p.as_os_str().is_empty() => ConfigError::ParseError {
            path: path.to_path_buf(),
            line,
            message,
        },
        other => other,
    }
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Pre-parse environment variable substitution.
///
/// Runs on raw YAML text BEFORE parsing to preserve type inference.
struct EnvSubstitution {
    warnings: Vec<LoadWarning>,
}

impl EnvSubstitution {
    const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Substitutes environment variables in raw YAML text.
    ///
    /// Supports:
    /// - `${VAR}` - expand to value (empty string if unset with warning)
    /// - `${VAR:-default}` - expand to default if unset
    /// - `${VAR:?message}` - fail if unset
    /// - `$$` - literal `$`
    fn substitute(&mut self, raw_yaml: &str, source_path: &Path) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw_yaml.len());
        let mut chars = raw_yaml.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let (var_name, default, error_msg) = Self::parse_var_spec(&mut chars)?;
                    match std::env::var(&var_name) {
                        Ok(value) => result.push_str(&value),
                        Err(_) => {
                            if let Some(default_val) = default {
                                result.push_str(&default_val);
                            } else if let Some(msg) = error_msg {
                                return Err(ConfigError::EnvVarNotSet {
                                    var: var_name,
                                    location: msg,
                                });
                            } else {
                                self.warnings.push(LoadWarning {
                                    message: format!(
                                        "Environment variable '{var_name}' is not set, using empty string"
                                    ),
                                    location: Some(source_path.display().to_string()),
                                });
                            }
                        }
                    }
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }

    /// Parses `NAME}`, `NAME:-default}` or `NAME:?message}` after `${`.
    ///
    /// Returns (`var_name`, `default_value`, `error_message`).
    fn parse_var_spec(
        chars: &mut std::iter::Peekable<std::str::Chars>,
    ) -> Result<(String, Option<String>, Option<String>), ConfigError> {
        let mut var_name = String::new();

        while let Some(c) = chars.next() {
            match c {
                '}' => return Ok((var_name, None, None)),
                ':' => match chars.peek() {
                    Some('-') => {
                        chars.next();
                        let default = Self::read_until_close(chars)?;
                        return Ok((var_name, Some(default), None));
                    }
                    Some('?') => {
                        chars.next();
                        let msg = Self::read_until_close(chars)?;
                        return Ok((var_name, None, Some(msg)));
                    }
                    _ => var_name.push(':'),
                },
                _ => var_name.push(c),
            }
        }

        Err(unclosed(&format!("${{{var_name}")))
    }

    /// Reads content until the closing `}`, allowing nested braces.
    fn read_until_close(
        chars: &mut std::iter::Peekable<std::str::Chars>,
    ) -> Result<String, ConfigError> {
        let mut value = String::new();
        let mut depth = 1;

        for c in chars.by_ref() {
            match c {
                '{' => {
                    depth += 1;
                    value.push(c);
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(value);
                    }
                    value.push(c);
                }
                _ => value.push(c),
            }
        }

        Err(unclosed("default or message"))
    }
}

fn unclosed(what: &str) -> ConfigError {
    ConfigError::ParseError {
        path: PathBuf::new(),
        line: None,
        message: format!("Unclosed environment variable reference: {what}"),
    }
}

// ============================================================================
// Tests
// ============================================================================
