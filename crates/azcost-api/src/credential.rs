//! Bearer token acquisition and caching.
//!
//! [`TokenProvider`] is the opaque credential source. [`CredentialCache`]
//! fetches a token lazily on the first API call and reuses it for the rest of
//! the process. There is no refresh: once the cached token passes its expiry
//! a single warning is logged and the token keeps being sent.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{ApiError, Result};

/// Resource the management token is requested for.
pub const MANAGEMENT_RESOURCE: &str = "https://management.azure.com/";

/// A bearer token and when it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    /// Whether the token is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_on
    }
}

/// Source of bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtain a token for the management API.
    async fn token(&self) -> Result<AccessToken>;

    /// Provider name for diagnostics.
    fn name(&self) -> &str;
}

/// Provider returning a fixed token (tests, or a token passed in by the user).
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    pub fn new(token: AccessToken) -> Self {
        Self { token }
    }

    /// A token that expires far in the future.
    pub fn never_expiring(token: impl Into<String>) -> Self {
        Self::new(AccessToken::new(token, DateTime::<Utc>::MAX_UTC))
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<AccessToken> {
        Ok(self.token.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Provider that asks the Azure CLI (`az account get-access-token`).
pub struct AzCliTokenProvider {
    binary: String,
    resource: String,
}

impl Default for AzCliTokenProvider {
    fn default() -> Self {
        Self {
            binary: "az".to_string(),
            resource: MANAGEMENT_RESOURCE.to_string(),
        }
    }
}

/// Subset of the `az account get-access-token` JSON output.
#[derive(Debug, Deserialize)]
struct AzCliToken {
    #[serde(rename = "accessToken")]
    access_token: String,
    /// Local time, e.g. `2024-05-01 10:20:30.000000` (all CLI versions)
    #[serde(rename = "expiresOn")]
    expires_on_local: Option<String>,
    /// POSIX timestamp (CLI 2.54+)
    #[serde(rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

impl AzCliTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different `az` executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Parse the CLI's JSON output into an [`AccessToken`].
    pub fn parse_output(output: &str) -> Result<AccessToken> {
        let raw: AzCliToken = serde_json::from_str(output)
            .map_err(|e| ApiError::Credential(format!("unexpected az output: {}", e)))?;

        let expires_on = if let Some(epoch) = raw.expires_on_epoch {
            DateTime::<Utc>::from_timestamp(epoch, 0)
                .ok_or_else(|| ApiError::Credential(format!("invalid expires_on: {}", epoch)))?
        } else if let Some(local) = raw.expires_on_local.as_deref() {
            let naive = NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M:%S%.f")
                .map_err(|e| ApiError::Credential(format!("invalid expiresOn '{}': {}", local, e)))?;
            Local
                .from_local_datetime(&naive)
                .earliest()
                .ok_or_else(|| ApiError::Credential(format!("ambiguous expiresOn '{}'", local)))?
                .with_timezone(&Utc)
        } else {
            return Err(ApiError::Credential("az output has no expiry".to_string()));
        };

        Ok(AccessToken::new(raw.access_token, expires_on))
    }
}

#[async_trait]
impl TokenProvider for AzCliTokenProvider {
    async fn token(&self) -> Result<AccessToken> {
        debug!(target: "azcost::api", binary = %self.binary, "requesting token from Azure CLI");

        let output = Command::new(&self.binary)
            .args(["account", "get-access-token", "--resource", &self.resource, "--output", "json"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ApiError::Credential(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ApiError::Credential(format!(
                "'{} account get-access-token' failed: {}",
                self.binary,
                stderr.trim()
            )));
        }

        Self::parse_output(&String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> &str {
        "azure-cli"
    }
}

/// Lazily fetched, never refreshed bearer token.
pub struct CredentialCache {
    provider: Arc<dyn TokenProvider>,
    cached: OnceCell<AccessToken>,
    expiry_reported: AtomicBool,
}

impl CredentialCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            cached: OnceCell::new(),
            expiry_reported: AtomicBool::new(false),
        }
    }

    /// The bearer token, fetching it on first use.
    pub async fn bearer(&self) -> Result<String> {
        let token = self
            .cached
            .get_or_try_init(|| async {
                debug!(target: "azcost::api", provider = self.provider.name(), "fetching token");
                let token = self.provider.token().await?;
                debug!(target: "azcost::api", expires_on = %token.expires_on, "token retrieved");
                Ok::<_, ApiError>(token)
            })
            .await?;

        if token.is_expired_at(Utc::now()) && !self.expiry_reported.swap(true, Ordering::Relaxed) {
            warn!(
                target: "azcost::api",
                expires_on = %token.expires_on,
                "cached token has expired; requests may be rejected"
            );
        }

        Ok(token.token.clone())
    }

    /// Whether a token has been fetched yet.
    pub fn is_fetched(&self) -> bool {
        self.cached.initialized()
    }
}
