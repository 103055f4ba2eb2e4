//! `validate`: load a configuration file and report every issue.

use legionbot_core::error::{ConfigError, LegionBotError, Severity, ValidationIssue};

use crate::cli::args::ValidateArgs;
use crate::config::ConfigLoader;

/// Validate a configuration file without starting the bot.
///
/// # Errors
///
/// Returns a config error if loading fails, or if `--strict` is set and
/// any warning was reported.
pub fn validate(args: &ValidateArgs) -> Result<(), LegionBotError> {
    let path = &args.config;
    tracing::info!(file = %path.display(), "validating configuration");

    let load_result = ConfigLoader::new().load(path)?;
    for warning in &load_result.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }

    if args.strict && !load_result.warnings.is_empty() {
        let errors = load_result
            .warnings
            .into_iter()
            .map(|w| ValidationIssue {
                path: w.location.unwrap_or_default(),
                message: w.message,
                severity: Severity::Error,
            })
            .collect();
        return Err(ConfigError::ValidationError {
            path: path.display().to_string(),
            errors,
        }
        .into());
    }

    tracing::info!(file = %path.display(), "configuration valid");
    Ok(())
}
