//! Semantic validation of a parsed [`BotConfig`].
//!
//! All issues are collected in one pass so the operator sees every problem
//! at once. Errors block loading, warnings are reported and ignored.

use std::time::Duration;

use legionbot_core::error::{Severity, ValidationIssue};

use super::schema::{BotConfig, StoreKind};

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `config`, collecting every issue.
    pub fn validate(&mut self, config: &BotConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_identity(config);
        self.validate_store(config);
        self.validate_completion(config);
        self.validate_timing(config);
        self.validate_console(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Sections
    // ========================================================================

    fn validate_identity(&mut self, config: &BotConfig) {
        let bot = &config.bot;
        if bot.username.trim().is_empty() {
            self.add_error("bot.username", "must not be empty");
        } else if !is_chat_name(&bot.username) {
            self.add_error("bot.username", NOT_A_CHAT_NAME);
        }
        if !bot.owner.is_empty() && !is_chat_name(&bot.owner) {
            self.add_error("bot.owner", NOT_A_CHAT_NAME);
        }
        for (i, alias) in bot.aliases.iter().enumerate() {
            if alias.trim().is_empty() {
                self.add_warning(&format!("bot.aliases[{i}]"), "empty alias is ignored");
            }
        }
    }

    fn validate_store(&mut self, config: &BotConfig) {
        match (config.store.kind, &config.store.path) {
            (StoreKind::JsonDir, None) => {
                self.add_error("store.path", "required when store.kind is json_dir");
            }
            (StoreKind::Memory, Some(_)) => {
                self.add_warning("store.path", "ignored for the memory store");
            }
            _ => {}
        }
    }

    fn validate_completion(&mut self, config: &BotConfig) {
        let Some(completion) = &config.completion else {
            self.add_warning(
                "completion",
                "not configured, Pinhead and mention replies will not work",
            );
            return;
        };
        if !completion.endpoint.starts_with("http://") && !completion.endpoint.starts_with("https://")
        {
            self.add_error("completion.endpoint", "must be an http(s) URL");
        }
        if completion.model.trim().is_empty() {
            self.add_error("completion.model", "must not be empty");
        }
        if completion.api_key.is_empty() {
            self.add_warning("completion.api_key", "empty, requests are sent unauthenticated");
        }
        if completion.timeout.is_zero() {
            self.add_error("completion.timeout", "must be greater than zero");
        }
    }

    fn validate_timing(&mut self, config: &BotConfig) {
        let outbound = &config.outbound;
        if outbound.call_timeout.is_zero() {
            self.add_error("outbound.call_timeout", "must be greater than zero");
        }
        if outbound.rate_interval > Duration::from_secs(60) {
            self.add_warning(
                "outbound.rate_interval",
                "longer than a minute, announcements will lag behind the game",
            );
        }
        if config.cache.viewer_ttl.is_zero() {
            self.add_warning("cache.viewer_ttl", "zero disables viewer count caching");
        }
        if config.metrics.port == Some(0) {
            self.add_error("metrics.port", "must be a non-zero port");
        }
    }

    fn validate_console(&mut self, config: &BotConfig) {
        for (i, channel) in config.console.channels.iter().enumerate() {
            if !is_chat_name(channel) {
                self.add_error(&format!("console.channels[{i}]"), NOT_A_CHAT_NAME);
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

const NOT_A_CHAT_NAME: &str = "must be a chat name (letters, digits, underscores)";

/// Chat names are ASCII letters, digits and underscores. Case is ignored,
/// names are lowercased when the bot starts.
fn is_chat_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
