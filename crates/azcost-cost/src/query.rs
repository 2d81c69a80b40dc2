//! Request payloads for the cost `query` and `forecast` endpoints.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CostError, Result};
use crate::filter::FilterExpression;

/// Cost metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MetricType {
    #[default]
    ActualCost,
    AmortizedCost,
}

impl MetricType {
    pub const ALL: [MetricType; 2] = [MetricType::ActualCost, MetricType::AmortizedCost];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::ActualCost => "ActualCost",
            MetricType::AmortizedCost => "AmortizedCost",
        }
    }
}

/// Billing period selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[default]
    BillingMonthToDate,
    Custom,
    MonthToDate,
    TheLastBillingMonth,
    TheLastMonth,
    WeekToDate,
}

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::BillingMonthToDate,
        Timeframe::Custom,
        Timeframe::MonthToDate,
        Timeframe::TheLastBillingMonth,
        Timeframe::TheLastMonth,
        Timeframe::WeekToDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::BillingMonthToDate => "BillingMonthToDate",
            Timeframe::Custom => "Custom",
            Timeframe::MonthToDate => "MonthToDate",
            Timeframe::TheLastBillingMonth => "TheLastBillingMonth",
            Timeframe::TheLastMonth => "TheLastMonth",
            Timeframe::WeekToDate => "WeekToDate",
        }
    }
}

macro_rules! impl_display_from_str {
    ($ty:ty, $kind:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = CostError;

            /// Case-insensitive parse of the API spelling.
            fn from_str(s: &str) -> Result<Self> {
                <$ty>::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| CostError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                        expected: <$ty>::ALL
                            .iter()
                            .map(|v| v.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}

impl_display_from_str!(MetricType, "metric");
impl_display_from_str!(Timeframe, "timeframe");

/// Whether per-meter breakdown is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetailMode {
    /// Group by meter; one record per (resource, meter)
    #[default]
    Detailed,
    /// No meter grouping; rows are aggregated per resource
    Aggregated,
}

impl DetailMode {
    /// From the `--exclude-meter-details` flag.
    pub fn from_exclude_flag(exclude_meter_details: bool) -> Self {
        if exclude_meter_details {
            DetailMode::Aggregated
        } else {
            DetailMode::Detailed
        }
    }
}

/// Caller options shared by cost and forecast queries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryOptions {
    pub metric: MetricType,
    pub timeframe: Timeframe,
    /// Start of a custom period (inclusive)
    pub from: Option<NaiveDate>,
    /// End of a custom period (inclusive)
    pub to: Option<NaiveDate>,
    pub detail: DetailMode,
}

impl QueryOptions {
    pub fn new(metric: MetricType, timeframe: Timeframe) -> Self {
        Self {
            metric,
            timeframe,
            ..Default::default()
        }
    }

    /// Set explicit period bounds.
    pub fn with_period(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn with_detail(mut self, detail: DetailMode) -> Self {
        self.detail = detail;
        self
    }

    /// Check the custom period. Bounds are ignored for other timeframes.
    pub fn validate(&self) -> Result<()> {
        if self.timeframe != Timeframe::Custom {
            return Ok(());
        }
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(CostError::InvalidTimePeriod(format!(
                "from ({}) is after to ({})",
                from, to
            ))),
            (Some(_), Some(_)) => Ok(()),
            (None, _) => Err(CostError::InvalidTimePeriod(
                "custom timeframe requires a from date".to_string(),
            )),
            (_, None) => Err(CostError::InvalidTimePeriod(
                "custom timeframe requires a to date".to_string(),
            )),
        }
    }

    fn time_period(&self) -> Option<TimePeriod> {
        match (self.timeframe, self.from, self.to) {
            (Timeframe::Custom, Some(from), Some(to)) => Some(TimePeriod { from, to }),
            _ => None,
        }
    }
}

/// Body of a cost or forecast request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDefinition {
    #[serde(rename = "type")]
    pub metric: MetricType,
    pub timeframe: Timeframe,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_period: Option<TimePeriod>,
    #[serde(rename = "dataSet")]
    pub dataset: Dataset,
}

/// Explicit period, serialized as `yyyy-MM-dd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimePeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Granularity {
    None,
    Daily,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub name: String,
    pub function: String,
}

impl Aggregation {
    fn sum(column: &str) -> Self {
        Self {
            name: column.to_string(),
            function: "Sum".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grouping {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

impl Grouping {
    fn dimension(name: &str) -> Self {
        Self {
            kind: "Dimension".to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sorting {
    pub direction: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub granularity: Granularity,
    pub aggregation: BTreeMap<String, Aggregation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterExpression>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub grouping: Vec<Grouping>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sorting: Vec<Sorting>,
}

/// Grouping dimensions always requested.
pub const BASE_GROUPING: &[&str] = &[
    "ResourceId",
    "ResourceType",
    "ResourceLocation",
    "ChargeType",
    "ResourceGroupName",
    "PublisherType",
];

/// Extra grouping dimensions for detailed mode.
pub const METER_GROUPING: &[&str] = &["MeterCategory", "MeterSubcategory", "Meter"];

/// Build a cost query body.
pub fn cost_query(
    options: &QueryOptions,
    filter: Option<FilterExpression>,
) -> Result<QueryDefinition> {
    options.validate()?;

    let mut grouping: Vec<Grouping> = BASE_GROUPING.iter().map(|d| Grouping::dimension(d)).collect();
    if options.detail == DetailMode::Detailed {
        grouping.extend(METER_GROUPING.iter().map(|d| Grouping::dimension(d)));
    }

    let aggregation = BTreeMap::from([
        ("totalCost".to_string(), Aggregation::sum("Cost")),
        ("totalCostUSD".to_string(), Aggregation::sum("CostUSD")),
    ]);

    Ok(QueryDefinition {
        metric: options.metric,
        timeframe: options.timeframe,
        time_period: options.time_period(),
        dataset: Dataset {
            granularity: Granularity::None,
            aggregation,
            include: vec!["Tags".to_string()],
            filter,
            grouping,
            sorting: Vec::new(),
        },
    })
}

/// Build a forecast query body.
pub fn forecast_query(
    options: &QueryOptions,
    filter: Option<FilterExpression>,
) -> Result<QueryDefinition> {
    options.validate()?;

    Ok(QueryDefinition {
        metric: options.metric,
        timeframe: options.timeframe,
        time_period: options.time_period(),
        dataset: Dataset {
            granularity: Granularity::Daily,
            aggregation: BTreeMap::from([("totalCost".to_string(), Aggregation::sum("Cost"))]),
            include: Vec::new(),
            filter,
            grouping: Vec::new(),
            sorting: vec![Sorting {
                direction: "ascending".to_string(),
                name: "UsageDate".to_string(),
            }],
        },
    })
}
