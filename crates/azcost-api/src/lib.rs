//! # azcost-api
//!
//! HTTP plumbing for azcost.
//!
//! This crate provides:
//! - [`CostManagementClient`] - Cost `query` and `forecast` calls with paging
//! - [`RetailPriceClient`] - Retail Prices lookups by OData filter
//! - [`CredentialCache`] / [`TokenProvider`] - Lazily fetched bearer token
//! - [`RetryPolicy`] - Retry-After aware backoff for throttled requests
//!
//! Payloads are built by the caller; responses come back as the raw wire
//! types in [`types`].

pub mod cost_client;
pub mod credential;
pub mod error;
pub mod price_client;
pub mod retry;
pub mod types;

// Re-export main types
pub use cost_client::{COST_API_VERSION, CostManagementClient, PAGE_SIZE};
pub use credential::{
    AccessToken, AzCliTokenProvider, CredentialCache, StaticTokenProvider, TokenProvider,
};
pub use error::{ApiError, Result};
pub use price_client::RetailPriceClient;
pub use retry::RetryPolicy;
pub use types::{PriceApiResponse, PriceRecord, QueryColumn, QueryProperties, QueryResponse};
