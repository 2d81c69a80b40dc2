//! # azcost-cost
//!
//! Cost query construction, row reconciliation and report assembly.
//!
//! This crate provides:
//! - [`build_filter`] - `Name=V1;V2` arguments to dimension / tag filters
//! - [`cost_query`] / [`forecast_query`] - Request bodies for Cost Management
//! - [`decode_cost_rows`] - Positional rows to [`CostResourceRecord`]s
//! - [`aggregate_by_resource`] - Per-resource rollup when meter detail is off
//! - [`PriceBook`] - Retail price matching per meter
//! - [`CostRetriever`] - Cost, forecast and price sweeps into a [`Report`]
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use azcost_api::{AzCliTokenProvider, CostManagementClient, RetailPriceClient};
//! use azcost_core::Settings;
//! use azcost_cost::{CostRetriever, MetricType, QueryOptions, ReportRequest, Timeframe};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::default();
//! let cost = CostManagementClient::from_settings(&settings, Arc::new(AzCliTokenProvider::new()))?;
//! let prices = RetailPriceClient::from_settings(&settings)?;
//!
//! let retriever = CostRetriever::new(cost, prices);
//! let request = ReportRequest::new(
//!     "00000000-0000-0000-0000-000000000000",
//!     vec!["/subscriptions/.../virtualMachines/vm1".to_string()],
//!     QueryOptions::new(MetricType::ActualCost, Timeframe::MonthToDate),
//! );
//! let report = retriever.run(&request).await?;
//! println!("Total: {:.2}", report.total_current);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod forecast;
pub mod models;
pub mod pricing;
pub mod query;
pub mod report;
pub mod retriever;
pub mod source;

// Re-export main types
pub use aggregator::aggregate_by_resource;
pub use decoder::{decode_cost_rows, decode_forecast_rows, parse_tags};
pub use error::{CostError, Result};
pub use filter::{DIMENSION_NAMES, FilterExpression, build_filter, parse_filter_arg};
pub use forecast::{forecast_for_resource, sum_forecast};
pub use models::{
    CostResourceRecord, ForecastRecord, MeterDetail, MeterKey, Report, ReportRow, ResourceCosts,
    ResourceReport,
};
pub use pricing::{PriceBook, UNKNOWN_LOCATION, find_price, price_filter};
pub use query::{DetailMode, MetricType, QueryDefinition, QueryOptions, Timeframe, cost_query, forecast_query};
pub use report::assemble_report;
pub use retriever::{CostRetriever, ReportRequest};
pub use source::{CostSource, PriceSource};
