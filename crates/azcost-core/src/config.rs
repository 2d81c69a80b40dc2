//! Settings for endpoints, timeouts and retry behaviour.
//!
//! Loaded from `~/.azcost/config.yaml` (or an explicit path). Every field has
//! a default, so a missing file or a partial file is fine.
//!
//! ```yaml
//! management_url: https://management.azure.com
//! timeout_secs: 60
//! retry:
//!   max_retries: 5
//! concurrency: 4
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AzCostError, Result};
use crate::logging::azcost_home;

/// Default Azure Resource Manager endpoint.
pub const DEFAULT_MANAGEMENT_URL: &str = "https://management.azure.com";

/// Default Azure Retail Prices endpoint.
pub const DEFAULT_PRICES_URL: &str = "https://prices.azure.com/api/retail/prices";

/// Default Retail Prices API version.
pub const DEFAULT_PRICES_API_VERSION: &str = "2023-01-01-preview";

/// Longest retry delay accepted from the settings file.
pub const MAX_RETRY_DELAY_SECS: u64 = 3600;

/// Top-level azcost settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the Resource Manager API (cost and forecast queries)
    pub management_url: String,

    /// Base URL of the Retail Prices API
    pub prices_url: String,

    /// `api-version` sent to the Retail Prices API
    pub prices_api_version: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Retry-After handling for throttled requests
    pub retry: RetrySettings,

    /// Number of forecast/price lookups in flight at once (1 = sequential)
    pub concurrency: usize,

    /// Currency label printed instead of the API's currency code. Amounts are
    /// not converted, so this only suits relabelling (e.g. "$" for "USD").
    pub currency_label: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            management_url: DEFAULT_MANAGEMENT_URL.to_string(),
            prices_url: DEFAULT_PRICES_URL.to_string(),
            prices_api_version: DEFAULT_PRICES_API_VERSION.to_string(),
            timeout_secs: 30,
            retry: RetrySettings::default(),
            concurrency: 1,
            currency_label: None,
        }
    }
}

/// Retry settings for throttled (429) and unavailable (503) responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,

    /// Delay used when the server sends no Retry-After header
    pub default_delay_secs: u64,

    /// Upper bound on any single wait
    pub max_delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            default_delay_secs: 5,
            max_delay_secs: 60,
        }
    }
}

impl Settings {
    /// Default config file location: `~/.azcost/config.yaml`
    pub fn default_path() -> Result<PathBuf> {
        Ok(azcost_home()?.join("config.yaml"))
    }

    /// Load settings from `path`, or from the default location.
    ///
    /// A missing file yields [`Settings::default`]; an unreadable or invalid
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| AzCostError::ConfigRead {
            path: path.clone(),
            source: e,
        })?;

        let settings = Self::from_yaml(&content).map_err(|e| match e {
            AzCostError::ConfigInvalid { message, .. } => AzCostError::ConfigInvalid {
                path: path.clone(),
                message,
            },
            other => other,
        })?;

        debug!(path = %path.display(), "loaded config");
        Ok(settings)
    }

    /// Parse settings from a YAML string and validate them.
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document is valid and means "all defaults".
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let settings: Settings =
            serde_yaml::from_str(content).map_err(|e| AzCostError::ConfigInvalid {
                path: PathBuf::from("<inline>"),
                message: e.to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(AzCostError::validation("timeout_secs must be greater than 0"));
        }
        if self.concurrency == 0 {
            return Err(AzCostError::validation("concurrency must be greater than 0"));
        }
        if self.retry.max_delay_secs > MAX_RETRY_DELAY_SECS {
            return Err(AzCostError::validation(format!(
                "retry.max_delay_secs must be at most {MAX_RETRY_DELAY_SECS}"
            )));
        }
        if self.retry.max_delay_secs < self.retry.default_delay_secs {
            return Err(AzCostError::validation(
                "retry.max_delay_secs must not be below retry.default_delay_secs",
            ));
        }
        Ok(())
    }

    /// Override the management endpoint (used by tests against a mock server).
    pub fn with_management_url(mut self, url: impl Into<String>) -> Self {
        self.management_url = url.into();
        self
    }

    /// Override the prices endpoint.
    pub fn with_prices_url(mut self, url: impl Into<String>) -> Self {
        self.prices_url = url.into();
        self
    }
}
