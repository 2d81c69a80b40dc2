//! Forecast merging.
//!
//! Forecasts are best-effort: any failure for a resource is reported as
//! `0.0`. Many subscriptions have no forecast support at all, so failures
//! are only visible with `--debug`.

use tracing::debug;

use crate::decoder::decode_forecast_rows;
use crate::error::Result;
use crate::filter::FilterExpression;
use crate::models::ForecastRecord;
use crate::query::{QueryOptions, forecast_query};
use crate::retriever::resource_filter;
use crate::source::CostSource;

/// Sum of forecast costs.
pub fn sum_forecast(records: &[ForecastRecord]) -> f64 {
    records.iter().map(|r| r.cost).sum()
}

/// Forecast for one resource, or `0.0` if it cannot be obtained.
pub async fn forecast_for_resource<C: CostSource + ?Sized>(
    source: &C,
    subscription_id: &str,
    resource_id: &str,
    options: &QueryOptions,
    extra_filters: &[FilterExpression],
) -> f64 {
    match try_forecast(source, subscription_id, resource_id, options, extra_filters).await {
        Ok(total) => {
            debug!(target: "azcost::forecast", resource_id, total, "Forecast retrieved");
            total
        }
        Err(e) => {
            debug!(
                target: "azcost::forecast",
                resource_id,
                error = %e,
                "Forecast unavailable, using 0.0"
            );
            0.0
        }
    }
}

async fn try_forecast<C: CostSource + ?Sized>(
    source: &C,
    subscription_id: &str,
    resource_id: &str,
    options: &QueryOptions,
    extra_filters: &[FilterExpression],
) -> Result<f64> {
    let definition = forecast_query(options, Some(resource_filter(resource_id, extra_filters)))?;
    let response = source.forecast(subscription_id, &definition).await?;
    let records = decode_forecast_rows(&response.properties.rows)?;
    Ok(sum_forecast(&records))
}
