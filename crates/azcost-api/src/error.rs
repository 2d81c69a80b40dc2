//! Error types for the HTTP layer.

use thiserror::Error;

/// HTTP layer errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success status from an endpoint (after retries, if any)
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Request URL (without query string)
        url: String,
        /// Response body, possibly truncated
        body: String,
        /// Seconds the server asked us to wait, if it said so
        retry_after_secs: Option<u64>,
    },

    /// Network timeout
    #[error("Network timeout: {0}")]
    Timeout(String),

    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Other transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bearer token could not be obtained
    #[error("Credential error: {0}")]
    Credential(String),

    /// Client misconfiguration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Longest body excerpt kept in [`ApiError::Status`].
const MAX_BODY_EXCERPT: usize = 2048;

impl ApiError {
    /// Build a status error from a failed response.
    pub fn from_http_status(
        status: u16,
        url: impl Into<String>,
        body: &str,
        retry_after: Option<&str>,
    ) -> Self {
        let body = if body.len() > MAX_BODY_EXCERPT {
            let mut end = MAX_BODY_EXCERPT;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &body[..end])
        } else {
            body.to_string()
        };

        ApiError::Status {
            status,
            url: url.into(),
            body,
            retry_after_secs: retry_after.and_then(Self::parse_retry_after),
        }
    }

    /// Classify a reqwest transport error.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(err.to_string())
        } else if err.is_connect() {
            ApiError::ConnectionFailed(err.to_string())
        } else {
            ApiError::Http(err)
        }
    }

    /// Parse a Retry-After header value.
    ///
    /// Accepts delta-seconds (`"120"`) or an HTTP date. Dates in the past
    /// yield `Some(0)`.
    pub fn parse_retry_after(value: &str) -> Option<u64> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if let Ok(secs) = value.parse::<u64>() {
            return Some(secs);
        }
        let when = chrono::DateTime::parse_from_rfc2822(value).ok()?;
        let delta = when.with_timezone(&chrono::Utc) - chrono::Utc::now();
        Some(delta.num_seconds().max(0) as u64)
    }

    /// HTTP status code, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Seconds the server asked us to wait.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            ApiError::Status {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }

    /// Check if this error is retryable (throttling and transient failures).
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => is_retryable_status(*status),
            ApiError::Timeout(_) | ApiError::ConnectionFailed(_) => true,
            _ => false,
        }
    }

    /// Check if this error is the server throttling us.
    pub fn is_rate_limit(&self) -> bool {
        self.status() == Some(429)
    }
}

/// Status codes worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type for HTTP operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after_integer() {
        assert_eq!(ApiError::parse_retry_after("60"), Some(60));
        assert_eq!(ApiError::parse_retry_after("  90  "), Some(90));
        assert_eq!(ApiError::parse_retry_after("0"), Some(0));
    }

    #[test]
    fn test_parse_retry_after_invalid() {
        assert_eq!(ApiError::parse_retry_after("invalid"), None);
        assert_eq!(ApiError::parse_retry_after(""), None);
        assert_eq!(ApiError::parse_retry_after("-10"), None);
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let future = ApiError::parse_retry_after("Wed, 21 Oct 2099 07:28:00 GMT");
        assert!(future.unwrap() > 0);

        let past = ApiError::parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(past, Some(0));
    }

    #[test]
    fn test_status_classification() {
        let throttled = ApiError::from_http_status(429, "https://x", "slow down", Some("12"));
        assert!(throttled.is_retryable());
        assert!(throttled.is_rate_limit());
        assert_eq!(throttled.retry_after_secs(), Some(12));

        let forbidden = ApiError::from_http_status(403, "https://x", "no", None);
        assert!(!forbidden.is_retryable());
        assert_eq!(forbidden.status(), Some(403));
        assert_eq!(forbidden.retry_after_secs(), None);
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "é".repeat(MAX_BODY_EXCERPT);
        let err = ApiError::from_http_status(500, "https://x", &body, None);
        match err {
            ApiError::Status { body, .. } => {
                assert!(body.ends_with("..."));
                assert!(body.len() <= MAX_BODY_EXCERPT + 3);
            }
            _ => panic!("expected Status"),
        }
    }
}
