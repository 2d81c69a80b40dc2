//! Per-resource aggregation for runs without meter detail.
//!
//! The cost query can still return several rows for one resource (different
//! locations or charge types). These are collapsed into a single record:
//! costs are summed, locations joined with `", "` and everything else comes
//! from the first row seen.

use std::collections::HashMap;

use tracing::debug;

use crate::models::CostResourceRecord;

/// Separator for joined locations.
pub const LOCATION_SEPARATOR: &str = ", ";

/// Collapse records to one per resource id, in order of first appearance.
pub fn aggregate_by_resource(records: Vec<CostResourceRecord>) -> Vec<CostResourceRecord> {
    let input_len = records.len();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(CostResourceRecord, Vec<String>)> = Vec::new();

    for record in records {
        match index.get(&record.resource_id).copied() {
            Some(i) => {
                let (first, locations) = &mut groups[i];
                first.cost += record.cost;
                first.cost_usd += record.cost_usd;
                locations.push(record.resource_location);
            }
            None => {
                index.insert(record.resource_id.clone(), groups.len());
                let locations = vec![record.resource_location.clone()];
                groups.push((record, locations));
            }
        }
    }

    debug!(
        target: "azcost::cost",
        rows = input_len,
        resources = groups.len(),
        "Aggregated cost rows per resource"
    );

    groups
        .into_iter()
        .map(|(first, locations)| CostResourceRecord {
            resource_location: locations.join(LOCATION_SEPARATOR),
            meter: None,
            ..first
        })
        .collect()
}
