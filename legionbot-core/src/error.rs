//! Error types for `legionbot`
//!
//! Errors are split by collaborator (store, gateway, completion), by
//! configuration loading, and by engine preconditions. None of them ever
//! escapes a game mode: modes log and fall back to their failure branch.
//! They surface only from administrative entry points and process wiring.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `legionbot` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Channel store error (unreadable or unwritable record)
    pub const STORE_ERROR: i32 = 4;

    /// Chat gateway error
    pub const GATEWAY_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `legionbot` operations.
#[derive(Debug, Error)]
pub enum LegionBotError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Channel store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Chat gateway error
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Text completion error
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// Engine precondition error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LegionBotError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) => ExitCode::CONFIG_ERROR,
            Self::Store(_) => ExitCode::STORE_ERROR,
            Self::Gateway(_) => ExitCode::GATEWAY_ERROR,
            Self::Completion(_) | Self::Engine(_) => ExitCode::ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", format_issues(errors))]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set (referenced at {location})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Location in the configuration where it was referenced
        location: String,
    },
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "outbound.rate_interval")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Prevents the configuration from being used
    Error,
    /// Reported but does not prevent loading
    Warning,
}

// ============================================================================
// Store Errors
// ============================================================================

/// Channel store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend I/O failure
    #[error("store I/O error at {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A persisted record could not be decoded
    #[error("corrupt record for channel '{channel}': {message}")]
    Corrupt {
        /// Channel whose record is unreadable
        channel: String,
        /// Decoder message
        message: String,
    },

    /// A record could not be encoded
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

// ============================================================================
// Gateway Errors
// ============================================================================

/// Chat gateway errors for outbound actions and metadata lookups.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Call exceeded its deadline
    #[error("gateway call '{operation}' timed out")]
    Timeout {
        /// Gateway operation name
        operation: &'static str,
    },

    /// The platform refused the action
    #[error("gateway rejected request: {0}")]
    Rejected(String),

    /// The platform could not be reached
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Completion Errors
// ============================================================================

/// Text completion errors.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Completion backend is not configured
    #[error("text completion is disabled")]
    Disabled,

    /// Call exceeded its deadline
    #[error("text completion timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Transport or HTTP-level failure
    #[error("text completion request failed: {0}")]
    Request(String),

    /// Response did not match the expected format
    #[error("invalid completion format: {0}")]
    InvalidFormat(String),
}

// ============================================================================
// Engine Errors
// ============================================================================

/// Engine precondition errors returned by administrative entry points.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A mode is already running in the channel
    #[error("mode '{mode}' is already active in channel '{channel}'")]
    ModeActive {
        /// Channel name
        channel: String,
        /// Running mode
        mode: String,
    },

    /// No mode with that name is registered
    #[error("unknown mode: {0}")]
    UnknownMode(String),

    /// Channel is disabled or muted
    #[error("channel '{0}' is disabled")]
    ChannelMuted(String),
}

/// Result type alias for `legionbot` operations.
pub type Result<T> = std::result::Result<T, LegionBotError>;
