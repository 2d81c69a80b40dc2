//! Plain-text table output.

use azcost_api::PriceRecord;
use azcost_cost::{DetailMode, Report, ReportRow, ResourceReport};

const PLACEHOLDER: &str = "---";

/// Two-decimal amount.
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

/// Column-aligned text table.
struct Table {
    headers: Vec<&'static str>,
    right_aligned: Vec<bool>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(columns: &[(&'static str, bool)]) -> Self {
        Self {
            headers: columns.iter().map(|(h, _)| *h).collect(),
            right_aligned: columns.iter().map(|(_, r)| *r).collect(),
            rows: Vec::new(),
        }
    }

    fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn add_separator(&mut self) {
        self.rows.push(vec![PLACEHOLDER.to_string(); self.headers.len()]);
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }
        widths
    }

    fn format_line(&self, cells: &[String], widths: &[usize]) -> String {
        let formatted: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &width)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                if self.right_aligned.get(i).copied().unwrap_or(false) {
                    format!("{:>width$}", cell)
                } else {
                    format!("{:<width$}", cell)
                }
            })
            .collect();
        formatted.join(" | ").trim_end().to_string()
    }

    fn render(&self) -> String {
        let widths = self.widths();
        let headers: Vec<String> = self.headers.iter().map(|h| h.to_string()).collect();

        let mut lines = vec![self.format_line(&headers, &widths)];
        lines.push(
            widths
                .iter()
                .map(|w| "-".repeat(*w))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in &self.rows {
            lines.push(self.format_line(row, &widths));
        }
        lines.join("\n")
    }
}

fn meter_cell(row: &ReportRow) -> String {
    if row.unit_of_measure.is_empty() {
        row.meter_name.clone()
    } else {
        format!(
            "{} ({} @ {})",
            row.meter_name,
            row.unit_of_measure,
            format_amount(row.unit_price)
        )
    }
}

fn header_row(resource: &ResourceReport, location: String) -> Vec<String> {
    vec![
        resource.resource_name.clone(),
        resource.resource_type.clone(),
        location,
        PLACEHOLDER.to_string(),
        PLACEHOLDER.to_string(),
        PLACEHOLDER.to_string(),
        PLACEHOLDER.to_string(),
        format_amount(resource.current_cost),
        format_amount(resource.current_cost + resource.forecast_cost),
    ]
}

/// Cost report as text: title lines followed by the resource table.
pub fn render_report(report: &Report, resource_group: &str) -> String {
    let mut table = Table::new(&[
        ("Name", false),
        ("Type", false),
        ("Location", false),
        ("Service", false),
        ("Tier", false),
        ("Meter", false),
        ("Retail", true),
        ("Current", true),
        ("Forecast", true),
    ]);

    for resource in &report.resources {
        match report.detail {
            DetailMode::Detailed => {
                table.add_row(header_row(resource, PLACEHOLDER.to_string()));
                for row in &resource.rows {
                    table.add_row(vec![
                        String::new(),
                        String::new(),
                        row.location.clone(),
                        row.service_name.clone(),
                        row.service_tier.clone(),
                        meter_cell(row),
                        format_amount(row.retail_price),
                        format_amount(row.current_cost),
                        String::new(),
                    ]);
                }
            }
            DetailMode::Aggregated => {
                let locations = resource
                    .rows
                    .iter()
                    .map(|r| r.location.as_str())
                    .filter(|l| !l.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ");
                table.add_row(header_row(resource, locations));
            }
        }
    }

    table.add_separator();
    table.add_row(vec![
        "Total".to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        format_amount(report.total_current),
        format_amount(report.total_with_forecast),
    ]);

    let mut out = String::new();
    out.push_str("Current Billing Period Cost and Forecast by Resource\n");
    out.push_str(&format!("Subscription: {}\n", report.subscription_id));
    out.push_str(&format!("Resource group: {}\n", resource_group));
    if let Some(currency) = &report.currency {
        out.push_str(&format!("Currency: {}\n", currency));
    }
    out.push('\n');
    out.push_str(&table.render());
    out.push('\n');
    out
}

/// Retail price items as text.
pub fn render_prices(items: &[PriceRecord]) -> String {
    if items.is_empty() {
        return "No retail prices found.\n".to_string();
    }

    let mut table = Table::new(&[
        ("Region", false),
        ("Service", false),
        ("Meter", false),
        ("Product", false),
        ("SKU", false),
        ("Type", false),
        ("Unit", false),
        ("Retail", true),
        ("Unit price", true),
        ("Currency", false),
    ]);

    for item in items {
        table.add_row(vec![
            item.arm_region_name.clone(),
            item.service_name.clone(),
            item.meter_name.clone(),
            item.product_name.clone(),
            item.sku_name.clone(),
            item.price_type.clone(),
            item.unit_of_measure.clone(),
            format!("{:.4}", item.retail_price),
            format!("{:.4}", item.unit_price),
            item.currency_code.clone(),
        ]);
    }

    let mut out = table.render();
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(meter: &str, cost: f64, unit: &str) -> ReportRow {
        ReportRow {
            resource_name: "vm1".into(),
            resource_type: "microsoft.compute/virtualmachines".into(),
            location: "westeurope".into(),
            service_name: "Virtual Machines".into(),
            service_tier: "BS Series".into(),
            meter_name: meter.into(),
            retail_price: if unit.is_empty() { 0.0 } else { 0.0104 },
            unit_price: if unit.is_empty() { 0.0 } else { 0.0104 },
            unit_of_measure: unit.into(),
            current_cost: cost,
            forecast_cost: 0.0,
        }
    }

    fn report(detail: DetailMode, rows: Vec<ReportRow>) -> Report {
        Report {
            subscription_id: "sub-1".into(),
            detail,
            resources: vec![ResourceReport {
                resource_id: "/x/vm1".into(),
                resource_name: "vm1".into(),
                resource_type: "microsoft.compute/virtualmachines".into(),
                current_cost: 15.0,
                forecast_cost: 4.5,
                rows,
            }],
            total_current: 15.0,
            total_with_forecast: 19.5,
            currency: Some("USD".into()),
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(15.0), "15.00");
        assert_eq!(format_amount(0.0104), "0.01");
    }

    #[test]
    fn test_detailed_report_lists_meters() {
        let text = render_report(
            &report(DetailMode::Detailed, vec![row("B1s", 10.0, "1 Hour"), row("P10", 5.0, "")]),
            "rg-web",
        );

        assert!(text.contains("Subscription: sub-1"));
        assert!(text.contains("Resource group: rg-web"));
        assert!(text.contains("B1s (1 Hour @ 0.01)"));
        let meter_line = text.lines().find(|l| l.contains("B1s (")).unwrap();
        assert!(meter_line.contains("westeurope"));
        assert!(text.contains("10.00"));
        assert!(text.contains("19.50"));

        let total = text.lines().find(|l| l.starts_with("Total")).unwrap();
        assert!(total.contains("15.00"));
        assert!(total.ends_with("19.50"));
    }

    #[test]
    fn test_aggregated_report_shows_locations() {
        let mut single = row("", 15.0, "");
        single.location = "westeurope, northeurope".into();
        let text = render_report(&report(DetailMode::Aggregated, vec![single]), "rg-web");

        let header = text.lines().find(|l| l.starts_with("Name")).unwrap();
        let vm_line = text.lines().find(|l| l.starts_with("vm1")).unwrap();
        let column = |line: &str, i: usize| line.split(" | ").nth(i).unwrap().trim().to_string();

        assert_eq!(column(header, 2), "Location");
        assert_eq!(column(vm_line, 2), "westeurope, northeurope");
        assert_eq!(column(header, 3), "Service");
        assert_eq!(column(vm_line, 3), "---");
        assert!(!text.contains("Virtual Machines"));
    }

    #[test]
    fn test_columns_are_aligned() {
        let text = render_report(&report(DetailMode::Detailed, vec![row("B1s", 10.0, "")]), "rg");
        let table: Vec<&str> = text.lines().skip_while(|l| !l.starts_with("Name")).collect();
        let header_pipe = table[0].find('|').unwrap();
        for line in table.iter().skip(2) {
            assert_eq!(line.find('|'), Some(header_pipe), "{line}");
        }
    }

    #[test]
    fn test_render_prices() {
        let items = vec![PriceRecord::new("westeurope", "Virtual Machines", "B1s", 0.0104).with_unit("1 Hour")];
        let text = render_prices(&items);
        assert!(text.contains("westeurope"));
        assert!(text.contains("0.0104"));
        assert_eq!(render_prices(&[]), "No retail prices found.\n");
    }
}
