//! Row decoding for cost and forecast responses.
//!
//! Cost rows are positional. The column layout depends on whether meter
//! grouping was requested:
//!
//! | mode       | columns |
//! |------------|---------|
//! | detailed   | Cost, CostUSD, ResourceId, ResourceType, ResourceLocation, ChargeType, ResourceGroupName, PublisherType, ServiceName, ServiceTier, Meter, Tags, Currency |
//! | aggregated | Cost, CostUSD, ResourceId, ResourceType, ResourceLocation, ChargeType, ResourceGroupName, PublisherType, Tags, Currency |

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::trace;

use crate::error::{CostError, Result};
use crate::models::{CostResourceRecord, ForecastRecord, MeterDetail};
use crate::query::DetailMode;

/// Columns in a detailed (meter-grouped) row.
const DETAILED_COLUMNS: usize = 13;

/// Columns in an aggregated row.
const AGGREGATED_COLUMNS: usize = 10;

/// `null` text columns decode as "".
fn nullable<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct DetailedRow(
    f64,
    f64,
    #[serde(deserialize_with = "nullable")] String,
    #[serde(deserialize_with = "nullable")] String,
    #[serde(deserialize_with = "nullable")] String,
    #[serde(deserialize_with = "nullable")] String,
    #[serde(deserialize_with = "nullable")] String,
    #[serde(deserialize_with = "nullable")] String,
    #[serde(deserialize_with = "nullable")] String,
    #[serde(deserialize_with = "nullable")] String,
    #[serde(deserialize_with = "nullable")] String,
    Option<Vec<String>>,
    #[serde(deserialize_with = "nullable")] String,
);

#[derive(Debug, Deserialize)]
struct AggregatedRow(
    f64,
    f64,
    #[serde(deserialize_with = "nullable")] String,
    #[serde(deserialize_with = "nullable")] String,
    #[serde(deserialize_with = "nullable")] String,
    #[serde(deserialize_with = "nullable")] String,
    #[serde(deserialize_with = "nullable")] String,
    #[serde(deserialize_with = "nullable")] String,
    Option<Vec<String>>,
    #[serde(deserialize_with = "nullable")] String,
);

impl From<DetailedRow> for CostResourceRecord {
    fn from(row: DetailedRow) -> Self {
        let DetailedRow(
            cost,
            cost_usd,
            resource_id,
            resource_type,
            resource_location,
            charge_type,
            resource_group_name,
            publisher_type,
            service_name,
            service_tier,
            meter,
            tags,
            currency,
        ) = row;

        CostResourceRecord {
            cost,
            cost_usd,
            resource_id,
            resource_type,
            resource_location,
            charge_type,
            resource_group_name,
            publisher_type,
            meter: Some(MeterDetail {
                service_name,
                service_tier,
                meter,
            }),
            tags: parse_tags(tags.as_deref().unwrap_or_default()),
            currency,
        }
    }
}

impl From<AggregatedRow> for CostResourceRecord {
    fn from(row: AggregatedRow) -> Self {
        let AggregatedRow(
            cost,
            cost_usd,
            resource_id,
            resource_type,
            resource_location,
            charge_type,
            resource_group_name,
            publisher_type,
            tags,
            currency,
        ) = row;

        CostResourceRecord {
            cost,
            cost_usd,
            resource_id,
            resource_type,
            resource_location,
            charge_type,
            resource_group_name,
            publisher_type,
            meter: None,
            tags: parse_tags(tags.as_deref().unwrap_or_default()),
            currency,
        }
    }
}

/// Parse `"key":"value"` tag entries.
///
/// Entries that don't split into exactly two parts on `:` are dropped.
pub fn parse_tags<S: AsRef<str>>(entries: &[S]) -> BTreeMap<String, String> {
    entries
        .iter()
        .filter_map(|entry| {
            let parts: Vec<&str> = entry.as_ref().split(':').collect();
            match parts.as_slice() {
                [key, value] => Some((
                    key.trim_matches('"').to_string(),
                    value.trim_matches('"').to_string(),
                )),
                _ => None,
            }
        })
        .collect()
}

/// Decode cost rows for the given mode, preserving order.
///
/// Columns past the mode's width are ignored. A row shorter than the width
/// is a decode error.
pub fn decode_cost_rows(rows: &[Vec<Value>], mode: DetailMode) -> Result<Vec<CostResourceRecord>> {
    let width = match mode {
        DetailMode::Detailed => DETAILED_COLUMNS,
        DetailMode::Aggregated => AGGREGATED_COLUMNS,
    };

    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            if row.len() > width {
                trace!(target: "azcost::cost", row = index, extra = row.len() - width, "Ignoring trailing columns");
            }
            let value = Value::Array(row.iter().take(width).cloned().collect());
            let record = match mode {
                DetailMode::Detailed => serde_json::from_value::<DetailedRow>(value).map(Into::into),
                DetailMode::Aggregated => {
                    serde_json::from_value::<AggregatedRow>(value).map(Into::into)
                }
            };
            record.map_err(|e| CostError::decode(index, e.to_string()))
        })
        .collect()
}

/// Decode forecast rows: `[Cost, UsageDate, CostStatus, Currency, ...]`.
pub fn decode_forecast_rows(rows: &[Vec<Value>]) -> Result<Vec<ForecastRecord>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| decode_forecast_row(index, row))
        .collect()
}

fn decode_forecast_row(index: usize, row: &[Value]) -> Result<ForecastRecord> {
    if row.len() < 4 {
        return Err(CostError::decode(
            index,
            format!("expected at least 4 forecast columns, got {}", row.len()),
        ));
    }

    let cost = row[0]
        .as_f64()
        .ok_or_else(|| CostError::decode(index, format!("cost is not a number: {}", row[0])))?;
    let date = parse_usage_date(&row[1])
        .ok_or_else(|| CostError::decode(index, format!("invalid usage date: {}", row[1])))?;
    let currency = row[3].as_str().unwrap_or_default().to_string();

    trace!(target: "azcost::forecast", %date, cost, "Decoded forecast row");

    Ok(ForecastRecord {
        date,
        cost,
        cost_usd: cost,
        currency,
    })
}

/// `yyyyMMdd` as a JSON number or string.
fn parse_usage_date(value: &Value) -> Option<NaiveDate> {
    let text = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => format!("{:.0}", n.as_f64()?),
        },
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    NaiveDate::parse_from_str(&text, "%Y%m%d").ok()
}
