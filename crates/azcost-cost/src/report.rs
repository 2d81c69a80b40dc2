//! Report assembly.
//!
//! Joins per-resource costs, forecasts and matched retail prices into
//! [`Report`] sections. Formatting is left to the caller.

use crate::models::{CostResourceRecord, Report, ReportRow, ResourceCosts, ResourceReport};
use crate::pricing::PriceBook;
use crate::query::DetailMode;

/// Build the report from fetched resource costs and prices.
///
/// `currency_label` replaces the currency code reported by the API, if set.
/// Amounts are never converted.
pub fn assemble_report(
    subscription_id: &str,
    resources: &[ResourceCosts],
    prices: &PriceBook,
    detail: DetailMode,
    currency_label: Option<&str>,
) -> Report {
    let sections: Vec<ResourceReport> = resources
        .iter()
        .map(|resource| resource_section(resource, prices, detail))
        .collect();

    let total_current: f64 = resources.iter().map(|r| r.current_cost).sum();
    let total_with_forecast: f64 = resources
        .iter()
        .map(|r| r.current_cost + r.forecast_cost)
        .sum();

    let currency = currency_label
        .map(str::to_string)
        .or_else(|| resources.iter().find_map(|r| r.currency()).map(str::to_string));

    Report {
        subscription_id: subscription_id.to_string(),
        detail,
        resources: sections,
        total_current,
        total_with_forecast,
        currency,
    }
}

fn resource_section(resource: &ResourceCosts, prices: &PriceBook, detail: DetailMode) -> ResourceReport {
    let rows = match detail {
        DetailMode::Detailed => resource
            .records
            .iter()
            .map(|record| meter_row(resource, record, prices))
            .collect(),
        DetailMode::Aggregated => resource
            .records
            .iter()
            .map(|record| aggregated_row(resource, record))
            .collect(),
    };

    ResourceReport {
        resource_id: resource.resource_id.clone(),
        resource_name: resource.resource_name.clone(),
        resource_type: resource.resource_type.clone(),
        current_cost: resource.current_cost,
        forecast_cost: resource.forecast_cost,
        rows,
    }
}

fn meter_row(resource: &ResourceCosts, record: &CostResourceRecord, prices: &PriceBook) -> ReportRow {
    let price = record.meter_key().and_then(|key| prices.lookup(&key));
    let meter = record.meter.clone().unwrap_or_default();

    ReportRow {
        resource_name: resource.resource_name.clone(),
        resource_type: record.resource_type.clone(),
        location: record.resource_location.clone(),
        service_name: meter.service_name,
        service_tier: meter.service_tier,
        meter_name: meter.meter,
        retail_price: price.map(|p| p.retail_price).unwrap_or(0.0),
        unit_price: price.map(|p| p.unit_price).unwrap_or(0.0),
        unit_of_measure: price.map(|p| p.unit_of_measure.clone()).unwrap_or_default(),
        current_cost: record.cost,
        forecast_cost: 0.0,
    }
}

fn aggregated_row(resource: &ResourceCosts, record: &CostResourceRecord) -> ReportRow {
    ReportRow {
        resource_name: resource.resource_name.clone(),
        resource_type: record.resource_type.clone(),
        location: record.resource_location.clone(),
        service_name: String::new(),
        service_tier: String::new(),
        meter_name: String::new(),
        retail_price: 0.0,
        unit_price: 0.0,
        unit_of_measure: String::new(),
        current_cost: record.cost,
        forecast_cost: resource.forecast_cost,
    }
}
