//! Retail price matching.

use std::collections::{HashMap, HashSet};

use azcost_api::PriceRecord;
use tracing::debug;

use crate::models::{MeterKey, ResourceCosts};

/// Location value that matches any region.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Distinct meter keys across all resources, in first-seen order.
///
/// Placeholder meters (no service and no meter name) are skipped.
pub fn distinct_meters(resources: &[ResourceCosts]) -> Vec<MeterKey> {
    let mut seen = HashSet::new();
    resources
        .iter()
        .flat_map(|r| r.records.iter())
        .filter_map(|record| record.meter_key())
        .filter(|key| !(key.service_name.is_empty() && key.meter_name.is_empty()))
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Quote a value for an OData string literal.
fn odata_quote(value: &str) -> String {
    value.replace('\'', "''")
}

/// OData filter for a meter's retail prices.
pub fn price_filter(key: &MeterKey) -> String {
    let mut filter = format!(
        "contains(serviceName, '{}') and contains(meterName, '{}')",
        odata_quote(&key.service_name),
        odata_quote(&key.meter_name)
    );
    if key.arm_location != UNKNOWN_LOCATION {
        filter.push_str(&format!(
            " and armRegionName eq '{}'",
            odata_quote(&key.arm_location)
        ));
    }
    filter
}

/// First item matching the key exactly. `Unknown` location matches any region.
pub fn find_price<'a>(items: &'a [PriceRecord], key: &MeterKey) -> Option<&'a PriceRecord> {
    items.iter().find(|item| {
        (key.arm_location == UNKNOWN_LOCATION || item.arm_region_name == key.arm_location)
            && item.service_name == key.service_name
            && item.meter_name == key.meter_name
    })
}

/// Price items fetched per meter key.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    entries: HashMap<MeterKey, Vec<PriceRecord>>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the items returned for a key.
    pub fn insert(&mut self, key: MeterKey, items: Vec<PriceRecord>) {
        self.entries.insert(key, items);
    }

    /// Matching price for a key, if any.
    pub fn lookup(&self, key: &MeterKey) -> Option<&PriceRecord> {
        let found = self
            .entries
            .get(key)
            .and_then(|items| find_price(items, key));
        if found.is_none() {
            debug!(
                target: "azcost::cost",
                service = %key.service_name,
                meter = %key.meter_name,
                location = %key.arm_location,
                "No retail price match"
            );
        }
        found
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<(MeterKey, Vec<PriceRecord>)> for PriceBook {
    fn extend<I: IntoIterator<Item = (MeterKey, Vec<PriceRecord>)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl FromIterator<(MeterKey, Vec<PriceRecord>)> for PriceBook {
    fn from_iter<I: IntoIterator<Item = (MeterKey, Vec<PriceRecord>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CostResourceRecord, MeterDetail};
    use crate::query::DetailMode;

    fn key(location: &str) -> MeterKey {
        MeterKey::new(location, "Virtual Machines", "BS Series", "B1s")
    }

    fn meter_record(id: &str, location: &str, meter: &str) -> CostResourceRecord {
        let mut r = CostResourceRecord::zero(id, DetailMode::Detailed);
        r.resource_location = location.to_string();
        r.meter = Some(MeterDetail::new("Virtual Machines", "BS Series", meter));
        r
    }

    #[test]
    fn test_price_filter_with_location() {
        assert_eq!(
            price_filter(&key("westeurope")),
            "contains(serviceName, 'Virtual Machines') and contains(meterName, 'B1s') and armRegionName eq 'westeurope'"
        );
    }

    #[test]
    fn test_price_filter_unknown_location_has_no_region() {
        assert_eq!(
            price_filter(&key(UNKNOWN_LOCATION)),
            "contains(serviceName, 'Virtual Machines') and contains(meterName, 'B1s')"
        );
    }

    #[test]
    fn test_price_filter_escapes_quotes() {
        let k = MeterKey::new("eastus", "Azure App Service", "", "P1 v2 'Premium'");
        assert!(price_filter(&k).contains("contains(meterName, 'P1 v2 ''Premium''')"));
    }

    #[test]
    fn test_find_price_requires_exact_names_and_region() {
        let items = vec![
            PriceRecord::new("westeurope", "Virtual Machines", "B1s Low Priority", 0.002),
            PriceRecord::new("northeurope", "Virtual Machines", "B1s", 0.0098),
            PriceRecord::new("westeurope", "Virtual Machines", "B1s", 0.0104),
        ];
        let found = find_price(&items, &key("westeurope")).unwrap();
        assert_eq!(found.retail_price, 0.0104);
        assert!(find_price(&items, &key("eastus")).is_none());
    }

    #[test]
    fn test_unknown_location_is_wildcard() {
        let items = vec![
            PriceRecord::new("northeurope", "Virtual Machines", "B1s", 0.0098),
            PriceRecord::new("westeurope", "Virtual Machines", "B1s", 0.0104),
        ];
        let found = find_price(&items, &key(UNKNOWN_LOCATION)).unwrap();
        assert_eq!(found.arm_region_name, "northeurope");
    }

    #[test]
    fn test_distinct_meters_keeps_first_occurrence() {
        let resources = vec![
            ResourceCosts::new(
                "/vm1",
                vec![
                    meter_record("/vm1", "westeurope", "B1s"),
                    meter_record("/vm1", "westeurope", "B2s"),
                ],
            ),
            ResourceCosts::new(
                "/vm2",
                vec![
                    meter_record("/vm2", "westeurope", "B1s"),
                    meter_record("/vm2", "eastus", "B1s"),
                ],
            ),
        ];
        let meters: Vec<(String, String)> = distinct_meters(&resources)
            .into_iter()
            .map(|k| (k.arm_location, k.meter_name))
            .collect();
        assert_eq!(
            meters,
            vec![
                ("westeurope".to_string(), "B1s".to_string()),
                ("westeurope".to_string(), "B2s".to_string()),
                ("eastus".to_string(), "B1s".to_string()),
            ]
        );
    }

    #[test]
    fn test_aggregated_records_have_no_meters() {
        let resources = vec![ResourceCosts::new(
            "/vm1",
            vec![CostResourceRecord::zero("/vm1", DetailMode::Aggregated)],
        )];
        assert!(distinct_meters(&resources).is_empty());
    }

    #[test]
    fn test_zero_record_meter_is_not_looked_up() {
        let resources = vec![ResourceCosts::new(
            "/idle",
            vec![CostResourceRecord::zero("/idle", DetailMode::Detailed)],
        )];
        assert!(distinct_meters(&resources).is_empty());
    }

    #[test]
    fn test_price_book_lookup() {
        let book: PriceBook = [(
            key("westeurope"),
            vec![PriceRecord::new("westeurope", "Virtual Machines", "B1s", 0.0104).with_unit("1 Hour")],
        )]
        .into_iter()
        .collect();

        assert_eq!(book.len(), 1);
        let found = book.lookup(&key("westeurope")).unwrap();
        assert_eq!(found.unit_of_measure, "1 Hour");
        assert!(book.lookup(&key("eastus")).is_none());
    }
}
