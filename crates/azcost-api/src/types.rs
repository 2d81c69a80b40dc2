//! Wire types for the Cost Management and Retail Prices APIs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response of the cost `query` and `forecast` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub properties: QueryProperties,
}

/// Tabular result: descriptive columns plus positional rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryProperties {
    /// Column descriptions. Informational only; rows are decoded by position.
    #[serde(default)]
    pub columns: Vec<QueryColumn>,

    /// Result rows, one JSON array per row
    pub rows: Vec<Vec<Value>>,

    /// Continuation URL for the next page, if any
    #[serde(rename = "nextLink", default, skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

/// One column description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

impl QueryResponse {
    /// Column names in order, for diagnostics.
    pub fn column_names(&self) -> Vec<&str> {
        self.properties
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Response of the Retail Prices API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceApiResponse {
    #[serde(rename = "BillingCurrency", default)]
    pub billing_currency: Option<String>,

    #[serde(rename = "CustomerEntityId", default)]
    pub customer_entity_id: Option<String>,

    #[serde(rename = "CustomerEntityType", default)]
    pub customer_entity_type: Option<String>,

    #[serde(rename = "Items", default)]
    pub items: Vec<PriceRecord>,

    #[serde(rename = "NextPageLink", default)]
    pub next_page_link: Option<String>,

    #[serde(rename = "Count", default)]
    pub count: Option<u64>,
}

/// A single retail price entry.
///
/// The fields used for matching (`armRegionName`, `serviceName`, `meterName`)
/// and pricing are required; the rest default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    pub arm_region_name: String,
    pub service_name: String,
    pub meter_name: String,
    pub unit_of_measure: String,
    pub retail_price: f64,
    pub unit_price: f64,

    #[serde(default)]
    pub currency_code: String,
    #[serde(default)]
    pub tier_minimum_units: f64,
    #[serde(default)]
    pub reservation_term: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub effective_start_date: Option<String>,
    #[serde(default)]
    pub meter_id: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub sku_id: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub sku_name: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub service_family: String,
    #[serde(rename = "type", default)]
    pub price_type: String,
    #[serde(default)]
    pub is_primary_meter_region: bool,
    #[serde(default)]
    pub arm_sku_name: String,
}

impl PriceRecord {
    /// Minimal record, mostly for tests and fixtures.
    pub fn new(
        arm_region_name: impl Into<String>,
        service_name: impl Into<String>,
        meter_name: impl Into<String>,
        retail_price: f64,
    ) -> Self {
        Self {
            arm_region_name: arm_region_name.into(),
            service_name: service_name.into(),
            meter_name: meter_name.into(),
            unit_of_measure: String::new(),
            retail_price,
            unit_price: retail_price,
            currency_code: "USD".to_string(),
            tier_minimum_units: 0.0,
            reservation_term: None,
            location: String::new(),
            effective_start_date: None,
            meter_id: String::new(),
            product_id: String::new(),
            sku_id: String::new(),
            product_name: String::new(),
            sku_name: String::new(),
            service_id: String::new(),
            service_family: String::new(),
            price_type: "Consumption".to_string(),
            is_primary_meter_region: true,
            arm_sku_name: String::new(),
        }
    }

    /// Set the unit of measure.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit_of_measure = unit.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_deserializes() {
        let json = serde_json::json!({
            "id": "subscriptions/x/providers/Microsoft.CostManagement/query/abc",
            "properties": {
                "nextLink": null,
                "columns": [
                    {"name": "Cost", "type": "Number"},
                    {"name": "UsageDate", "type": "Number"},
                    {"name": "Currency", "type": "String"}
                ],
                "rows": [[1.5, 20240501, "EUR"]]
            }
        });
        let response: QueryResponse = serde_json::from_value(json).unwrap();
        assert_eq!(response.column_names(), vec!["Cost", "UsageDate", "Currency"]);
        assert_eq!(response.properties.rows.len(), 1);
        assert!(response.properties.next_link.is_none());
    }

    #[test]
    fn test_query_response_requires_rows() {
        let json = serde_json::json!({"properties": {"columns": []}});
        assert!(serde_json::from_value::<QueryResponse>(json).is_err());
    }

    #[test]
    fn test_price_response_deserializes() {
        let json = serde_json::json!({
            "BillingCurrency": "USD",
            "CustomerEntityId": "Default",
            "CustomerEntityType": "Retail",
            "Items": [{
                "currencyCode": "USD",
                "tierMinimumUnits": 0.0,
                "retailPrice": 0.0104,
                "unitPrice": 0.0104,
                "armRegionName": "westeurope",
                "location": "EU West",
                "effectiveStartDate": "2021-06-01T00:00:00Z",
                "meterId": "000a794b-bdb0-58be-a0cd-0c3a0f222923",
                "meterName": "B1s",
                "productId": "DZH318Z0BQPS",
                "skuId": "DZH318Z0BQPS/00TG",
                "productName": "Virtual Machines BS Series",
                "skuName": "B1s",
                "serviceName": "Virtual Machines",
                "serviceId": "DZH313Z7MMC8",
                "serviceFamily": "Compute",
                "unitOfMeasure": "1 Hour",
                "type": "Consumption",
                "isPrimaryMeterRegion": true,
                "armSkuName": "Standard_B1s"
            }],
            "NextPageLink": null,
            "Count": 1
        });
        let response: PriceApiResponse = serde_json::from_value(json).unwrap();
        assert_eq!(response.items.len(), 1);
        let item = &response.items[0];
        assert_eq!(item.arm_region_name, "westeurope");
        assert_eq!(item.unit_of_measure, "1 Hour");
        assert_eq!(item.price_type, "Consumption");
        assert!(response.next_page_link.is_none());
    }
}
