//! Filter expressions for Cost Management queries.
//!
//! Turns `Name=Value1;Value2` arguments into the API's filter tree. Names in
//! [`DIMENSION_NAMES`] become dimension filters, anything else is treated as a
//! tag key.
//!
//! ```
//! use azcost_cost::filter::build_filter;
//!
//! let filter = build_filter(&["ResourceGroupName=rg-web", "env=prod;staging"])
//!     .unwrap()
//!     .unwrap();
//! let json = serde_json::to_value(&filter).unwrap();
//! assert_eq!(json["and"][0]["dimensions"]["name"], "ResourceGroupName");
//! assert_eq!(json["and"][1]["tags"]["values"][1], "staging");
//! ```

use serde::Serialize;

use crate::error::{CostError, Result};

/// Dimension names recognized by the Cost Management API.
pub const DIMENSION_NAMES: &[&str] = &[
    "PublisherType",
    "ResourceGroupName",
    "ResourceLocation",
    "ResourceId",
    "ServiceName",
    "ServiceTier",
    "ServiceFamily",
    "InvoiceId",
    "CustomerName",
    "PartnerName",
    "ResourceType",
    "ChargeType",
    "BillingPeriod",
    "MeterCategory",
    "MeterSubCategory",
];

/// Whether `name` is a dimension (exact, case-sensitive match).
pub fn is_dimension(name: &str) -> bool {
    DIMENSION_NAMES.contains(&name)
}

/// Comparison operator. The API only needs `In` here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilterOperator {
    In,
}

/// `{name, operator, values}` leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub name: String,
    pub operator: FilterOperator,
    pub values: Vec<String>,
}

/// Filter tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterExpression {
    Dimensions(Comparison),
    Tags(Comparison),
    And(Vec<FilterExpression>),
}

impl FilterExpression {
    /// `ResourceId In [id]`
    pub fn resource_id(id: impl Into<String>) -> Self {
        FilterExpression::Dimensions(Comparison {
            name: "ResourceId".to_string(),
            operator: FilterOperator::In,
            values: vec![id.into()],
        })
    }

    /// The leaf comparison, if this is not an `And` node.
    pub fn comparison(&self) -> Option<&Comparison> {
        match self {
            FilterExpression::Dimensions(c) | FilterExpression::Tags(c) => Some(c),
            FilterExpression::And(_) => None,
        }
    }

    /// Values of the first `ResourceId` dimension anywhere in the tree.
    pub fn resource_ids(&self) -> Option<&[String]> {
        match self {
            FilterExpression::Dimensions(c) if c.name == "ResourceId" => Some(&c.values),
            FilterExpression::And(children) => children.iter().find_map(|c| c.resource_ids()),
            _ => None,
        }
    }
}

/// Parse one `Name=Value1;Value2` argument.
pub fn parse_filter_arg(arg: &str) -> Result<FilterExpression> {
    let (name, values) = arg
        .split_once('=')
        .ok_or_else(|| CostError::Format(arg.to_string()))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(CostError::Format(arg.to_string()));
    }

    let comparison = Comparison {
        name: name.to_string(),
        operator: FilterOperator::In,
        values: values.split(';').map(str::to_string).collect(),
    };

    Ok(if is_dimension(name) {
        FilterExpression::Dimensions(comparison)
    } else {
        FilterExpression::Tags(comparison)
    })
}

/// Build the filter tree for a list of arguments.
///
/// No arguments means no filter. A single argument is returned as-is; more
/// than one are combined under `And` in input order.
pub fn build_filter<S: AsRef<str>>(args: &[S]) -> Result<Option<FilterExpression>> {
    let mut nodes = args
        .iter()
        .map(|a| parse_filter_arg(a.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    Ok(match nodes.len() {
        0 => None,
        1 => nodes.pop(),
        _ => Some(FilterExpression::And(nodes)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dimension_names_are_classified() {
        for name in DIMENSION_NAMES {
            let node = parse_filter_arg(&format!("{name}=x")).unwrap();
            assert!(matches!(node, FilterExpression::Dimensions(_)), "{name}");
        }
    }

    #[test]
    fn test_unknown_names_become_tags() {
        for name in ["env", "costcenter", "resourceid", "Meter"] {
            let node = parse_filter_arg(&format!("{name}=x")).unwrap();
            assert!(matches!(node, FilterExpression::Tags(_)), "{name}");
        }
    }

    #[test]
    fn test_values_split_on_semicolon() {
        let node = parse_filter_arg("ResourceLocation=westeurope;northeurope").unwrap();
        let c = node.comparison().unwrap();
        assert_eq!(c.name, "ResourceLocation");
        assert_eq!(c.operator, FilterOperator::In);
        assert_eq!(c.values, vec!["westeurope", "northeurope"]);
    }

    #[test]
    fn test_missing_equals_is_format_error() {
        let err = parse_filter_arg("ResourceGroupName").unwrap_err();
        match err {
            CostError::Format(arg) => assert_eq!(arg, "ResourceGroupName"),
            other => panic!("expected Format, got {other:?}"),
        }
        assert!(matches!(parse_filter_arg("=x"), Err(CostError::Format(_))));
    }

    #[test]
    fn test_no_filters() {
        let args: [&str; 0] = [];
        assert_eq!(build_filter(&args).unwrap(), None);
    }

    #[test]
    fn test_single_filter_is_not_wrapped() {
        let filter = build_filter(&["ResourceId=/sub/rg/vm1"]).unwrap().unwrap();
        assert_eq!(filter, FilterExpression::resource_id("/sub/rg/vm1"));
    }

    #[test]
    fn test_multiple_filters_are_anded_in_order() {
        let filter = build_filter(&["ResourceId=/sub/rg/vm1", "env=prod", "ChargeType=Usage"])
            .unwrap()
            .unwrap();
        match &filter {
            FilterExpression::And(children) => {
                let names: Vec<&str> = children
                    .iter()
                    .map(|c| c.comparison().unwrap().name.as_str())
                    .collect();
                assert_eq!(names, vec!["ResourceId", "env", "ChargeType"]);
            }
            other => panic!("expected And, got {other:?}"),
        }
        assert_eq!(filter.resource_ids().unwrap(), ["/sub/rg/vm1".to_string()]);
    }

    #[test]
    fn test_one_bad_argument_fails_the_whole_build() {
        assert!(build_filter(&["ResourceId=a", "oops"]).is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let filter = build_filter(&["ResourceGroupName=rg1", "env=prod"]).unwrap();
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({
                "and": [
                    {"dimensions": {"name": "ResourceGroupName", "operator": "In", "values": ["rg1"]}},
                    {"tags": {"name": "env", "operator": "In", "values": ["prod"]}}
                ]
            })
        );
    }
}
