//! Cost Management API client.
//!
//! Posts query and forecast payloads to
//! `/subscriptions/{id}/providers/Microsoft.CostManagement/{query|forecast}`
//! with a cached bearer token, follows `nextLink` pages, and applies the
//! [`RetryPolicy`] to every request.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use azcost_api::{AzCliTokenProvider, CostManagementClient};
//! use azcost_core::Settings;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = CostManagementClient::from_settings(
//!     &Settings::default(),
//!     Arc::new(AzCliTokenProvider::new()),
//! )?;
//! let body = serde_json::json!({"type": "ActualCost", "timeframe": "MonthToDate"});
//! let response = client.query("00000000-0000-0000-0000-000000000000", &body).await?;
//! println!("{} rows", response.properties.rows.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use azcost_core::Settings;
use reqwest::header::ACCEPT;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::credential::{CredentialCache, TokenProvider};
use crate::error::{ApiError, Result};
use crate::retry::RetryPolicy;
use crate::types::QueryResponse;

/// `api-version` of the Cost Management endpoints.
pub const COST_API_VERSION: &str = "2021-10-01";

/// Rows requested per page (`$top`).
pub const PAGE_SIZE: u32 = 5000;

/// Build the shared reqwest client with the configured timeout.
pub(crate) fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Client for the Cost Management `query` and `forecast` endpoints.
pub struct CostManagementClient {
    client: reqwest::Client,
    base_url: String,
    credential: CredentialCache,
    retry: RetryPolicy,
}

impl CostManagementClient {
    /// Create a client from settings and a token provider.
    pub fn from_settings(settings: &Settings, provider: Arc<dyn TokenProvider>) -> Result<Self> {
        Ok(Self {
            client: build_http_client(settings.timeout_secs)?,
            base_url: settings.management_url.trim_end_matches('/').to_string(),
            credential: CredentialCache::new(provider),
            retry: RetryPolicy::from_settings(&settings.retry),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Endpoint URL for `action` (`query` or `forecast`).
    pub fn endpoint(&self, subscription_id: &str, action: &str) -> String {
        format!(
            "{}/subscriptions/{}/providers/Microsoft.CostManagement/{}?api-version={}&$top={}",
            self.base_url, subscription_id, action, COST_API_VERSION, PAGE_SIZE
        )
    }

    /// Run a cost query. All pages are concatenated into one response.
    pub async fn query<B>(&self, subscription_id: &str, body: &B) -> Result<QueryResponse>
    where
        B: Serialize + ?Sized,
    {
        self.post_paged(self.endpoint(subscription_id, "query"), body)
            .await
    }

    /// Run a forecast query. All pages are concatenated into one response.
    pub async fn forecast<B>(&self, subscription_id: &str, body: &B) -> Result<QueryResponse>
    where
        B: Serialize + ?Sized,
    {
        self.post_paged(self.endpoint(subscription_id, "forecast"), body)
            .await
    }

    async fn post_paged<B>(&self, url: String, body: &B) -> Result<QueryResponse>
    where
        B: Serialize + ?Sized,
    {
        let payload = serde_json::to_value(body)?;
        let token = self.credential.bearer().await?;

        debug!(target: "azcost::api", %url, payload = %payload, "posting cost query");

        let mut response = self.post(&url, &token, &payload).await?;
        let mut next = response.properties.next_link.take();
        let mut pages = 1;

        while let Some(link) = next.filter(|l| !l.is_empty()) {
            debug!(target: "azcost::api", page = pages + 1, "following nextLink");
            let mut page = self.post(&link, &token, &payload).await?;
            response.properties.rows.append(&mut page.properties.rows);
            next = page.properties.next_link.take();
            pages += 1;
        }

        trace!(
            target: "azcost::api",
            columns = ?response.column_names(),
            rows = response.properties.rows.len(),
            pages,
            "cost query complete"
        );
        Ok(response)
    }

    async fn post(&self, url: &str, token: &str, payload: &Value) -> Result<QueryResponse> {
        let response = self
            .retry
            .execute(|| {
                self.client
                    .post(url)
                    .bearer_auth(token)
                    .header(ACCEPT, "application/json")
                    .json(payload)
            })
            .await?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(ApiError::from_transport)?;
        debug!(target: "azcost::api", %status, size = bytes.len(), "received response");

        Ok(serde_json::from_slice(&bytes)?)
    }
}
