//! Error types shared by the azcost crates.
//!
//! [`AzCostError`] covers the ambient concerns (configuration and logging
//! setup). Domain errors live next to their crates (`ApiError`, `CostError`).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`AzCostError`].
pub type Result<T> = std::result::Result<T, AzCostError>;

/// Errors raised while setting up the process.
#[derive(Debug, Error)]
pub enum AzCostError {
    /// Configuration file could not be read
    #[error("Failed to read configuration at {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is invalid YAML
    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Directory creation failed
    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Home directory could not be determined
    #[error("Home directory not found")]
    HomeNotFound,
}

impl AzCostError {
    /// Shorthand for [`AzCostError::ConfigValidation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Settings file problems, as opposed to environment problems.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigRead { .. } | Self::ConfigInvalid { .. } | Self::ConfigValidation { .. }
        )
    }

    /// Returns actionable guidance for the user
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::ConfigInvalid { .. } => Some("Check YAML syntax in ~/.azcost/config.yaml"),
            Self::ConfigValidation { .. } => {
                Some("Check the value ranges in ~/.azcost/config.yaml")
            }
            Self::HomeNotFound => Some("Set HOME or pass --log-dir and --config explicitly"),
            _ => None,
        }
    }
}
