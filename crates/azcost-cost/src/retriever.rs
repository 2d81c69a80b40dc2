//! Cost retrieval orchestration.
//!
//! A report is built in three sweeps over the requested resources:
//!
//! 1. **cost** - one cost query per resource, in order. Any failure aborts.
//! 2. **forecast** - one forecast query per resource. Failures become `0.0`.
//! 3. **prices** - one retail price lookup per distinct meter. Any failure aborts.
//!
//! The report is only assembled once all three have finished. Sweeps 2 and 3
//! may overlap requests up to the configured concurrency; results keep their
//! input order.

use futures_util::{StreamExt, TryStreamExt, stream};
use tracing::{debug, info, trace};

use crate::aggregator::aggregate_by_resource;
use crate::decoder::decode_cost_rows;
use crate::error::{CostError, Result};
use crate::filter::FilterExpression;
use crate::forecast::forecast_for_resource;
use crate::models::{CostResourceRecord, Report, ResourceCosts};
use crate::pricing::{PriceBook, distinct_meters, price_filter};
use crate::query::{DetailMode, QueryOptions, cost_query};
use crate::report::assemble_report;
use crate::source::{CostSource, PriceSource};

/// Filter for one resource: `ResourceId In [id]` AND any caller filters.
pub fn resource_filter(resource_id: &str, extra: &[FilterExpression]) -> FilterExpression {
    let id = FilterExpression::resource_id(resource_id);
    if extra.is_empty() {
        return id;
    }

    let mut nodes = vec![id];
    for node in extra {
        match node {
            FilterExpression::And(children) => nodes.extend(children.iter().cloned()),
            other => nodes.push(other.clone()),
        }
    }
    FilterExpression::And(nodes)
}

/// Everything needed to build one report.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub subscription_id: String,
    pub resource_ids: Vec<String>,
    pub options: QueryOptions,
    /// Extra filters ANDed onto every per-resource query
    pub filters: Vec<FilterExpression>,
}

impl ReportRequest {
    pub fn new(subscription_id: impl Into<String>, resource_ids: Vec<String>, options: QueryOptions) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_ids,
            options,
            filters: Vec::new(),
        }
    }

    pub fn with_filters(mut self, filters: Vec<FilterExpression>) -> Self {
        self.filters = filters;
        self
    }
}

/// Runs the cost, forecast and price sweeps against its sources.
pub struct CostRetriever<C, P> {
    cost: C,
    prices: P,
    concurrency: usize,
    currency_label: Option<String>,
}

impl<C: CostSource, P: PriceSource> CostRetriever<C, P> {
    /// Sequential retriever.
    pub fn new(cost: C, prices: P) -> Self {
        Self {
            cost,
            prices,
            concurrency: 1,
            currency_label: None,
        }
    }

    /// Allow up to `concurrency` forecast or price requests in flight.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Print `currency` as the report's currency label.
    ///
    /// Only the label changes; amounts stay in the currency the API billed in.
    pub fn with_currency_label(mut self, currency: Option<String>) -> Self {
        self.currency_label = currency;
        self
    }

    pub fn cost_source(&self) -> &C {
        &self.cost
    }

    pub fn price_source(&self) -> &P {
        &self.prices
    }

    /// Cost records for one resource.
    ///
    /// A resource without rows yields a single zero record.
    pub async fn resource_costs(
        &self,
        subscription_id: &str,
        resource_id: &str,
        options: &QueryOptions,
        filters: &[FilterExpression],
    ) -> Result<ResourceCosts> {
        let definition = cost_query(options, Some(resource_filter(resource_id, filters)))?;
        let response = self.cost.query(subscription_id, &definition).await?;

        trace!(
            target: "azcost::cost",
            resource_id,
            columns = ?response.column_names(),
            "Cost query columns"
        );

        let mut records = decode_cost_rows(&response.properties.rows, options.detail)?;
        if options.detail == DetailMode::Aggregated {
            records = aggregate_by_resource(records);
        }
        if records.is_empty() {
            debug!(target: "azcost::cost", resource_id, "No cost rows, using zero record");
            records.push(CostResourceRecord::zero(resource_id, options.detail));
        }

        debug!(
            target: "azcost::cost",
            resource_id,
            records = records.len(),
            "Resource costs retrieved"
        );
        Ok(ResourceCosts::new(resource_id, records))
    }

    /// Sweep 1: cost for every resource, in order.
    async fn cost_sweep(&self, request: &ReportRequest) -> Result<Vec<ResourceCosts>> {
        let mut resources = Vec::with_capacity(request.resource_ids.len());
        for resource_id in &request.resource_ids {
            let costs = self
                .resource_costs(
                    &request.subscription_id,
                    resource_id,
                    &request.options,
                    &request.filters,
                )
                .await?;
            resources.push(costs);
        }
        Ok(resources)
    }

    /// Sweep 2: forecast for every resource. Never fails.
    async fn forecast_sweep(&self, request: &ReportRequest, resources: Vec<ResourceCosts>) -> Vec<ResourceCosts> {
        let forecasts: Vec<f64> = stream::iter(resources.iter())
            .map(|resource| {
                forecast_for_resource(
                    &self.cost,
                    &request.subscription_id,
                    &resource.resource_id,
                    &request.options,
                    &request.filters,
                )
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        resources
            .into_iter()
            .zip(forecasts)
            .map(|(resource, forecast)| resource.with_forecast(forecast))
            .collect()
    }

    /// Sweep 3: retail prices for every distinct meter.
    async fn price_sweep(&self, resources: &[ResourceCosts]) -> Result<PriceBook> {
        let meters = distinct_meters(resources);
        debug!(target: "azcost::cost", meters = meters.len(), "Looking up retail prices");

        stream::iter(meters)
            .map(|key| async move {
                let items = self.prices.prices(&price_filter(&key)).await?;
                Ok::<_, CostError>((key, items))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    /// Build the full report.
    ///
    /// Options are validated before any request is sent.
    pub async fn run(&self, request: &ReportRequest) -> Result<Report> {
        request.options.validate()?;

        info!(
            target: "azcost::cost",
            subscription_id = %request.subscription_id,
            resources = request.resource_ids.len(),
            metric = %request.options.metric,
            timeframe = %request.options.timeframe,
            detail = ?request.options.detail,
            "Building cost report"
        );

        let resources = self.cost_sweep(request).await?;
        let resources = self.forecast_sweep(request, resources).await;
        let prices = self.price_sweep(&resources).await?;

        let report = assemble_report(
            &request.subscription_id,
            &resources,
            &prices,
            request.options.detail,
            self.currency_label.as_deref(),
        );

        info!(
            target: "azcost::cost",
            total_current = report.total_current,
            total_with_forecast = report.total_with_forecast,
            "Cost report ready"
        );
        Ok(report)
    }
}
