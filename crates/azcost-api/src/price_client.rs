//! Azure Retail Prices API client.
//!
//! The Retail Prices API is anonymous; requests carry only an OData
//! `$filter`. Results are paged through `NextPageLink`.

use azcost_core::Settings;
use reqwest::header::ACCEPT;
use tracing::debug;

use crate::cost_client::build_http_client;
use crate::error::{ApiError, Result};
use crate::retry::RetryPolicy;
use crate::types::{PriceApiResponse, PriceRecord};

/// Client for `https://prices.azure.com/api/retail/prices`.
pub struct RetailPriceClient {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    retry: RetryPolicy,
}

impl RetailPriceClient {
    /// Create a client from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: build_http_client(settings.timeout_secs)?,
            base_url: settings.prices_url.clone(),
            api_version: settings.prices_api_version.clone(),
            retry: RetryPolicy::from_settings(&settings.retry),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch every price record matching an OData filter expression.
    pub async fn prices(&self, filter: &str) -> Result<Vec<PriceRecord>> {
        debug!(target: "azcost::api", %filter, "querying retail prices");

        let first = self
            .retry
            .execute(|| {
                self.client
                    .get(&self.base_url)
                    .header(ACCEPT, "application/json")
                    .query(&[
                        ("api-version", self.api_version.as_str()),
                        ("$filter", filter),
                    ])
            })
            .await?;
        let mut page = Self::parse(first).await?;
        let mut items = std::mem::take(&mut page.items);

        while let Some(link) = page.next_page_link.take().filter(|l| !l.is_empty()) {
            debug!(target: "azcost::api", %link, "following NextPageLink");
            let response = self
                .retry
                .execute(|| self.client.get(&link).header(ACCEPT, "application/json"))
                .await?;
            page = Self::parse(response).await?;
            items.append(&mut page.items);
        }

        debug!(target: "azcost::api", count = items.len(), "retail prices received");
        Ok(items)
    }

    async fn parse(response: reqwest::Response) -> Result<PriceApiResponse> {
        let bytes = response.bytes().await.map_err(ApiError::from_transport)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
