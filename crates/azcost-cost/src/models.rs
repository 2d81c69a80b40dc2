//! Data models for cost reconciliation and reporting.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::query::DetailMode;

/// Meter columns, present only when meter detail was requested.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MeterDetail {
    /// Meter category (the query's `MeterCategory` dimension)
    pub service_name: String,

    /// Meter subcategory (`MeterSubcategory`)
    pub service_tier: String,

    /// Meter name (`Meter`)
    pub meter: String,
}

impl MeterDetail {
    pub fn new(
        service_name: impl Into<String>,
        service_tier: impl Into<String>,
        meter: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            service_tier: service_tier.into(),
            meter: meter.into(),
        }
    }
}

/// One cost line for a resource.
///
/// In detailed mode there is one record per (resource, meter); in aggregated
/// mode one per resource and `meter` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostResourceRecord {
    /// Cost in billing currency
    pub cost: f64,

    /// Cost in USD
    pub cost_usd: f64,

    /// Full ARM resource id
    pub resource_id: String,

    pub resource_type: String,

    /// Location, or a `", "`-joined list after aggregation
    pub resource_location: String,

    pub charge_type: String,

    pub resource_group_name: String,

    pub publisher_type: String,

    /// Meter breakdown (detailed mode only)
    pub meter: Option<MeterDetail>,

    /// Resource tags
    pub tags: BTreeMap<String, String>,

    /// Billing currency code
    pub currency: String,
}

impl CostResourceRecord {
    /// Placeholder for a resource the query returned no rows for.
    pub fn zero(resource_id: impl Into<String>, mode: DetailMode) -> Self {
        Self {
            cost: 0.0,
            cost_usd: 0.0,
            resource_id: resource_id.into(),
            resource_type: String::new(),
            resource_location: String::new(),
            charge_type: String::new(),
            resource_group_name: String::new(),
            publisher_type: String::new(),
            meter: match mode {
                DetailMode::Detailed => Some(MeterDetail::default()),
                DetailMode::Aggregated => None,
            },
            tags: BTreeMap::new(),
            currency: String::new(),
        }
    }

    /// Last segment of the resource id.
    pub fn resource_name(&self) -> &str {
        resource_name(&self.resource_id)
    }

    /// Price lookup key, if this record carries meter detail.
    pub fn meter_key(&self) -> Option<MeterKey> {
        self.meter.as_ref().map(|m| MeterKey {
            arm_location: self.resource_location.clone(),
            service_name: m.service_name.clone(),
            service_tier: m.service_tier.clone(),
            meter_name: m.meter.clone(),
        })
    }
}

/// Last `/` segment of an ARM resource id.
pub fn resource_name(resource_id: &str) -> &str {
    resource_id.rsplit('/').next().unwrap_or(resource_id)
}

/// One day of forecast for a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    pub cost: f64,
    pub cost_usd: f64,
    pub currency: String,
}

/// Deduplication key for retail price lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeterKey {
    pub arm_location: String,
    pub service_name: String,
    pub service_tier: String,
    pub meter_name: String,
}

impl MeterKey {
    pub fn new(
        arm_location: impl Into<String>,
        service_name: impl Into<String>,
        service_tier: impl Into<String>,
        meter_name: impl Into<String>,
    ) -> Self {
        Self {
            arm_location: arm_location.into(),
            service_name: service_name.into(),
            service_tier: service_tier.into(),
            meter_name: meter_name.into(),
        }
    }
}

/// Everything fetched for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCosts {
    pub resource_id: String,
    pub resource_name: String,
    pub resource_type: String,

    /// Decoded (and, in aggregated mode, aggregated) cost lines
    pub records: Vec<CostResourceRecord>,

    /// Sum of `records[].cost`
    pub current_cost: f64,

    /// Forecast for the rest of the period (0.0 when unavailable)
    pub forecast_cost: f64,
}

impl ResourceCosts {
    /// Build from cost records; display fields come from the first record.
    pub fn new(resource_id: impl Into<String>, records: Vec<CostResourceRecord>) -> Self {
        let resource_id = resource_id.into();
        let resource_type = records
            .first()
            .map(|r| r.resource_type.clone())
            .unwrap_or_default();
        let current_cost = records.iter().map(|r| r.cost).sum();

        Self {
            resource_name: resource_name(&resource_id).to_string(),
            resource_id,
            resource_type,
            records,
            current_cost,
            forecast_cost: 0.0,
        }
    }

    /// Set the forecast.
    pub fn with_forecast(mut self, forecast_cost: f64) -> Self {
        self.forecast_cost = forecast_cost;
        self
    }

    /// Currency of the first record that reports one.
    pub fn currency(&self) -> Option<&str> {
        self.records
            .iter()
            .map(|r| r.currency.as_str())
            .find(|c| !c.is_empty())
    }
}

/// One display line of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub resource_name: String,
    pub resource_type: String,

    /// Location (joined list in aggregated mode)
    pub location: String,

    pub service_name: String,
    pub service_tier: String,
    pub meter_name: String,

    /// Matched retail price, 0.0 when unmatched
    pub retail_price: f64,

    /// Matched unit price, 0.0 when unmatched
    pub unit_price: f64,

    /// Matched unit of measure, empty when unmatched
    pub unit_of_measure: String,

    pub current_cost: f64,

    /// Resource forecast on aggregated rows; 0.0 on meter rows
    pub forecast_cost: f64,
}

/// One resource's section of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceReport {
    pub resource_id: String,
    pub resource_name: String,
    pub resource_type: String,
    pub current_cost: f64,
    pub forecast_cost: f64,

    /// One row per meter (detailed) or a single row (aggregated)
    pub rows: Vec<ReportRow>,
}

/// The assembled report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub subscription_id: String,
    pub detail: DetailMode,
    pub resources: Vec<ResourceReport>,

    /// Σ current cost
    pub total_current: f64,

    /// Σ (current + forecast)
    pub total_with_forecast: f64,

    /// Billing currency reported by the API, if any
    pub currency: Option<String>,
}

impl Report {
    /// All rows in resource order.
    pub fn rows(&self) -> impl Iterator<Item = &ReportRow> {
        self.resources.iter().flat_map(|r| r.rows.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(cost: f64, location: &str) -> CostResourceRecord {
        CostResourceRecord {
            cost,
            cost_usd: cost,
            resource_id: "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1".into(),
            resource_type: "microsoft.compute/virtualmachines".into(),
            resource_location: location.into(),
            charge_type: "usage".into(),
            resource_group_name: "rg".into(),
            publisher_type: "azure".into(),
            meter: Some(MeterDetail::new("Virtual Machines", "BS Series", "B1s")),
            tags: BTreeMap::new(),
            currency: "EUR".into(),
        }
    }

    #[test]
    fn test_resource_name_is_last_segment() {
        assert_eq!(record(1.0, "westeurope").resource_name(), "vm1");
        assert_eq!(resource_name("vm2"), "vm2");
        assert_eq!(resource_name(""), "");
    }

    #[test]
    fn test_zero_record_respects_mode() {
        let detailed = CostResourceRecord::zero("/a/b", DetailMode::Detailed);
        assert_eq!(detailed.cost, 0.0);
        assert_eq!(detailed.meter, Some(MeterDetail::default()));

        let aggregated = CostResourceRecord::zero("/a/b", DetailMode::Aggregated);
        assert!(aggregated.meter.is_none());
        assert!(aggregated.meter_key().is_none());
    }

    #[test]
    fn test_meter_key_uses_location() {
        let key = record(1.0, "westeurope").meter_key().unwrap();
        assert_eq!(key, MeterKey::new("westeurope", "Virtual Machines", "BS Series", "B1s"));
    }

    #[test]
    fn test_resource_costs_sums_records() {
        let costs = ResourceCosts::new(
            "/subscriptions/s/resourceGroups/rg/providers/x/vm1",
            vec![record(10.0, "westeurope"), record(5.0, "westeurope")],
        )
        .with_forecast(3.0);
        assert_eq!(costs.resource_name, "vm1");
        assert_eq!(costs.resource_type, "microsoft.compute/virtualmachines");
        assert_eq!(costs.current_cost, 15.0);
        assert_eq!(costs.forecast_cost, 3.0);
        assert_eq!(costs.currency(), Some("EUR"));
    }
}
