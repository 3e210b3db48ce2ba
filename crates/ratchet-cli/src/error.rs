//! Error types for the CLI application.

use ratchet_assurance::{AssuranceError, ConfigError};
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Assurance engine error
    #[error(transparent)]
    Assurance(#[from] AssuranceError),

    /// Store could not be opened
    #[error("Store error: {0}")]
    Store(#[from] ratchet_store::StoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No actor configured for a mutating command
    #[error("No actor configured. Pass --actor or set default_actor in the config file.")]
    NoActor,
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl CliError {
    /// Process exit code for this error
    ///
    /// Integrity findings exit with 3 so scripts can tell them apart from
    /// ordinary refusals.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Assurance(AssuranceError::Integrity(_)) => 3,
            CliError::Assurance(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let integrity = CliError::Assurance(AssuranceError::Integrity("digest".into()));
        assert_eq!(integrity.exit_code(), 3);

        let conflict = CliError::Assurance(AssuranceError::Conflict("taken".into()));
        assert_eq!(conflict.exit_code(), 2);

        assert_eq!(CliError::NoActor.exit_code(), 1);
    }
}
