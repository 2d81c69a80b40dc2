//! Data source traits for the retriever.
//!
//! [`CostSource`] and [`PriceSource`] abstract the HTTP clients so the
//! orchestration in [`crate::retriever`] can run against canned responses.
//!
//! ## Implementations
//!
//! - [`CostManagementClient`] - Cost Management `query` / `forecast`
//! - [`RetailPriceClient`] - Retail Prices API

use ::async_trait::async_trait;
use azcost_api::{CostManagementClient, PriceRecord, QueryResponse, RetailPriceClient};

use crate::query::QueryDefinition;

/// Source of cost and forecast tables.
#[async_trait]
pub trait CostSource: Send + Sync {
    /// Run a cost query; pages are already concatenated.
    async fn query(
        &self,
        subscription_id: &str,
        definition: &QueryDefinition,
    ) -> azcost_api::Result<QueryResponse>;

    /// Run a forecast query.
    async fn forecast(
        &self,
        subscription_id: &str,
        definition: &QueryDefinition,
    ) -> azcost_api::Result<QueryResponse>;
}

/// Source of retail price records.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// All price items matching an OData filter, across pages.
    async fn prices(&self, filter: &str) -> azcost_api::Result<Vec<PriceRecord>>;
}

#[async_trait]
impl CostSource for CostManagementClient {
    async fn query(
        &self,
        subscription_id: &str,
        definition: &QueryDefinition,
    ) -> azcost_api::Result<QueryResponse> {
        CostManagementClient::query(self, subscription_id, definition).await
    }

    async fn forecast(
        &self,
        subscription_id: &str,
        definition: &QueryDefinition,
    ) -> azcost_api::Result<QueryResponse> {
        CostManagementClient::forecast(self, subscription_id, definition).await
    }
}

#[async_trait]
impl PriceSource for RetailPriceClient {
    async fn prices(&self, filter: &str) -> azcost_api::Result<Vec<PriceRecord>> {
        RetailPriceClient::prices(self, filter).await
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-memory sources keyed by resource id / filter.

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use azcost_api::{ApiError, QueryProperties};
    use serde_json::Value;

    use super::*;

    /// Canned response for one resource.
    pub enum Canned {
        Rows(Vec<Vec<Value>>),
        Status(u16),
    }

    impl Canned {
        fn respond(&self) -> azcost_api::Result<QueryResponse> {
            match self {
                Canned::Rows(rows) => Ok(QueryResponse {
                    properties: QueryProperties {
                        rows: rows.clone(),
                        ..Default::default()
                    },
                }),
                Canned::Status(status) => Err(ApiError::from_http_status(
                    *status,
                    "https://management.example/mock",
                    "mock failure",
                    None,
                )),
            }
        }
    }

    #[derive(Default)]
    pub struct MockCostSource {
        pub costs: HashMap<String, Canned>,
        pub forecasts: HashMap<String, Canned>,
        pub calls: AtomicUsize,
        pub seen: Mutex<Vec<QueryDefinition>>,
    }

    impl MockCostSource {
        pub fn with_cost(mut self, id: &str, canned: Canned) -> Self {
            self.costs.insert(id.to_string(), canned);
            self
        }

        pub fn with_forecast(mut self, id: &str, canned: Canned) -> Self {
            self.forecasts.insert(id.to_string(), canned);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn lookup(
            &self,
            table: &HashMap<String, Canned>,
            definition: &QueryDefinition,
        ) -> azcost_api::Result<QueryResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(definition.clone());
            }
            let id = definition
                .dataset
                .filter
                .as_ref()
                .and_then(|f| f.resource_ids())
                .and_then(|ids| ids.first())
                .cloned()
                .unwrap_or_default();
            match table.get(&id) {
                Some(canned) => canned.respond(),
                None => Canned::Rows(Vec::new()).respond(),
            }
        }
    }

    #[async_trait]
    impl CostSource for MockCostSource {
        async fn query(
            &self,
            _subscription_id: &str,
            definition: &QueryDefinition,
        ) -> azcost_api::Result<QueryResponse> {
            self.lookup(&self.costs, definition)
        }

        async fn forecast(
            &self,
            _subscription_id: &str,
            definition: &QueryDefinition,
        ) -> azcost_api::Result<QueryResponse> {
            self.lookup(&self.forecasts, definition)
        }
    }

    #[derive(Default)]
    pub struct MockPriceSource {
        pub items: Vec<PriceRecord>,
        pub fail: bool,
        pub filters: Mutex<Vec<String>>,
    }

    impl MockPriceSource {
        pub fn new(items: Vec<PriceRecord>) -> Self {
            Self {
                items,
                ..Default::default()
            }
        }

        pub fn seen_filters(&self) -> Vec<String> {
            self.filters.lock().map(|f| f.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl PriceSource for MockPriceSource {
        async fn prices(&self, filter: &str) -> azcost_api::Result<Vec<PriceRecord>> {
            if let Ok(mut filters) = self.filters.lock() {
                filters.push(filter.to_string());
            }
            if self.fail {
                return Err(ApiError::from_http_status(
                    500,
                    "https://prices.example/mock",
                    "",
                    None,
                ));
            }
            Ok(self.items.clone())
        }
    }
}
