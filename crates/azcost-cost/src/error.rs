//! Error types for cost retrieval and reconciliation.

use azcost_api::ApiError;
use thiserror::Error;

/// Cost engine errors.
///
/// Every variant that reaches the caller aborts the report. Soft failures
/// (forecast, unmatched prices) are absorbed before they become a `CostError`.
#[derive(Error, Debug)]
pub enum CostError {
    /// Filter argument without `=` or with an empty name
    #[error("invalid filter argument '{0}': expected Name=Value1;Value2")]
    Format(String),

    /// Custom timeframe with missing or reversed bounds
    #[error("invalid time period: {0}")]
    InvalidTimePeriod(String),

    /// Unknown metric or timeframe name
    #[error("unknown {kind} '{value}' (expected one of: {expected})")]
    UnknownVariant {
        /// What was being parsed
        kind: &'static str,
        /// The rejected input
        value: String,
        /// Accepted spellings
        expected: String,
    },

    /// A result row did not match the column contract
    #[error("failed to decode row {row}: {message}")]
    Decode {
        /// Zero-based row index
        row: usize,
        /// What was wrong
        message: String,
    },

    /// Cost or price endpoint failure
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CostError {
    /// Create a decode error for a row.
    pub fn decode(row: usize, message: impl Into<String>) -> Self {
        CostError::Decode {
            row,
            message: message.into(),
        }
    }

    /// Whether the error is caused by user input rather than the service.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CostError::Format(_) | CostError::InvalidTimePeriod(_) | CostError::UnknownVariant { .. }
        )
    }

    /// Create a user-friendly message for this error.
    pub fn friendly_message(&self) -> String {
        match self {
            CostError::Api(e) if e.is_rate_limit() => {
                "Cost Management is throttling requests. Wait a minute and try again.".to_string()
            }
            CostError::Api(e) if matches!(e.status(), Some(401) | Some(403)) => {
                "Access denied. Run 'az login' and check your role on the subscription.".to_string()
            }
            CostError::Api(e) => format!("Azure API error: {}", e),
            CostError::Decode { .. } => {
                format!("Unexpected response layout from Cost Management: {}", self)
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for cost operations.
pub type Result<T> = std::result::Result<T, CostError>;
