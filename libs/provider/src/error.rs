//! Error types for provider operations.

use thiserror::Error;

/// Errors returned by provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("not authenticated with the provider")]
    NotAuthenticated,

    #[error("API error: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("timed out waiting for instance {instance} to reach state '{target}'")]
    WaitTimeout {
        instance: String,
        target: &'static str,
    },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ProviderError {
    /// Create an API error from response details.
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
        }
    }
}
