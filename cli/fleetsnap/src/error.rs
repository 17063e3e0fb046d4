//! Error handling and display for the CLI.

use colored::Colorize;
use fleet_provider::ProviderError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid command usage. Exits non-zero before any provider call.
    #[error("{0}")]
    Usage(String),
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    // Check for specific error types and provide hints
    if err.downcast_ref::<CliError>().is_some() {
        eprintln!(
            "\n{}",
            "Hint: scope the run with --project <name>, or pass --force to act on the whole fleet."
                .yellow()
        );
        return;
    }

    match err.downcast_ref::<ProviderError>() {
        Some(ProviderError::NotAuthenticated) => {
            eprintln!(
                "\n{}",
                "Hint: set FLEET_API_TOKEN or add a token to your credentials file.".yellow()
            );
        }
        Some(ProviderError::Network(_)) => {
            eprintln!(
                "\n{}",
                "Hint: check your network connection and API endpoint.".yellow()
            );
        }
        _ => {}
    }
}
