//! CLI command dispatch and handlers.

pub mod run;
pub mod validate;
pub mod version;

use legionbot_core::error::LegionBotError;
use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands};

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), LegionBotError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, cancel).await,
        Commands::Validate(args) => validate::validate(&args),
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
