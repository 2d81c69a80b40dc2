//! azcost - Azure cost and forecast by resource
//!
//! Reports current cost, forecast and retail prices for the resources of a
//! resource group, using the Cost Management and Retail Prices APIs.
//!
//! ## Usage
//!
//! ```bash
//! # Cost of every resource in a resource group (current billing month)
//! azcost cost-by-resource -r rg-web
//!
//! # One resource, last month, amortized, without meter breakdown
//! azcost cost-by-resource -r rg-web -i /subscriptions/.../vm1 -t TheLastMonth -m AmortizedCost --exclude-meter-details
//!
//! # Custom period, only resources tagged env=prod, as JSON
//! azcost cost-by-resource -r rg-web -t Custom --from 2024-01-01 --to 2024-01-31 --filter "env=prod" --json
//!
//! # Retail prices for a meter
//! azcost price-by-resource --service "Virtual Machines" --meter "B1s" --location westeurope
//! ```

mod discovery;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use azcost_api::{AzCliTokenProvider, CostManagementClient, RetailPriceClient};
use azcost_core::{LogGuard, Settings, init_logging};
use azcost_cost::{
    CostRetriever, DetailMode, FilterExpression, MeterKey, MetricType, QueryOptions, ReportRequest,
    Timeframe, UNKNOWN_LOCATION, find_price, parse_filter_arg, price_filter,
};
use chrono::{Datelike, Months, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use crate::discovery::AzCli;

/// Azure cost, forecast and retail prices by resource
#[derive(Parser, Debug)]
#[command(name = "azcost")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Directory for log files (defaults to ~/.azcost/logs/)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Settings file (defaults to ~/.azcost/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Current cost and forecast per resource, with retail prices per meter
    CostByResource(CostByResourceArgs),

    /// Retail prices for a service meter
    PriceByResource(PriceByResourceArgs),
}

#[derive(Args, Debug)]
struct CostByResourceArgs {
    /// Subscription id (defaults to the Azure CLI's active subscription)
    #[arg(short = 's', long)]
    subscription: Option<String>,

    /// Resource group whose resources are reported
    #[arg(short = 'r', long, required_unless_present = "resource_id")]
    resource_group: Option<String>,

    /// Report a single resource instead of the whole group
    #[arg(short = 'i', long)]
    resource_id: Option<String>,

    /// BillingMonthToDate, Custom, MonthToDate, TheLastBillingMonth, TheLastMonth or WeekToDate
    #[arg(short = 't', long, default_value_t = Timeframe::BillingMonthToDate)]
    timeframe: Timeframe,

    /// Start date for a Custom timeframe (defaults to the first day of the previous month)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// End date for a Custom timeframe (defaults to today)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// ActualCost or AmortizedCost
    #[arg(short = 'm', long, default_value_t = MetricType::ActualCost)]
    metric: MetricType,

    /// One row per resource instead of one per meter
    #[arg(long)]
    exclude_meter_details: bool,

    /// Extra dimension or tag filter, e.g. "ResourceLocation=westeurope;northeurope" (repeatable)
    #[arg(long = "filter", value_name = "NAME=V1;V2")]
    filters: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct PriceByResourceArgs {
    /// Service name, e.g. "Virtual Machines"
    #[arg(long)]
    service: String,

    /// Meter name, e.g. "B1s"
    #[arg(long)]
    meter: String,

    /// ARM region; "Unknown" matches every region
    #[arg(long, default_value = UNKNOWN_LOCATION)]
    location: String,

    /// Print the price items as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("azcost failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn setup_logging(cli: &Cli) -> azcost_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.debug)
}

fn load_settings(path: Option<&std::path::Path>) -> Result<Settings> {
    Settings::load(path).map_err(|e| match e.guidance() {
        Some(hint) => anyhow!("{} ({})", e, hint),
        None => anyhow!(e),
    })
}

async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref())?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting azcost");

    match cli.command {
        Command::CostByResource(args) => cost_by_resource(args, &settings).await,
        Command::PriceByResource(args) => price_by_resource(args, &settings).await,
    }
}

/// First day of the month before `today`.
fn first_of_previous_month(today: NaiveDate) -> NaiveDate {
    let first = today.with_day(1).unwrap_or(today);
    first.checked_sub_months(Months::new(1)).unwrap_or(first)
}

impl CostByResourceArgs {
    fn query_options(&self, today: NaiveDate) -> QueryOptions {
        QueryOptions {
            metric: self.metric,
            timeframe: self.timeframe,
            from: Some(self.from.unwrap_or_else(|| first_of_previous_month(today))),
            to: Some(self.to.unwrap_or(today)),
            detail: DetailMode::from_exclude_flag(self.exclude_meter_details),
        }
    }

    /// Query options and filters, rejected here before any command or request runs.
    fn prepare(&self, today: NaiveDate) -> azcost_cost::Result<(QueryOptions, Vec<FilterExpression>)> {
        let options = self.query_options(today);
        options.validate()?;
        let filters = self
            .filters
            .iter()
            .map(|f| parse_filter_arg(f))
            .collect::<azcost_cost::Result<Vec<_>>>()?;
        Ok((options, filters))
    }
}

async fn cost_by_resource(args: CostByResourceArgs, settings: &Settings) -> Result<()> {
    let (options, filters) = args
        .prepare(Utc::now().date_naive())
        .map_err(|e| anyhow!(e.friendly_message()))?;

    let az = AzCli::new();

    let subscription_id = match &args.subscription {
        Some(id) => id.clone(),
        None => az
            .default_subscription()
            .await
            .context("Missing subscription id. Pass --subscription or run 'az login'")?,
    };

    let resource_ids = match (&args.resource_id, &args.resource_group) {
        (Some(id), _) => vec![id.clone()],
        (None, Some(group)) => az
            .resource_ids(&subscription_id, group)
            .await
            .with_context(|| format!("failed to list resources in '{}'", group))?,
        (None, None) => return Err(anyhow!("either --resource-group or --resource-id is required")),
    };
    info!(subscription_id = %subscription_id, resources = resource_ids.len(), "Resolved resources");

    let cost = CostManagementClient::from_settings(settings, Arc::new(AzCliTokenProvider::new()))?;
    let prices = RetailPriceClient::from_settings(settings)?;
    let retriever = CostRetriever::new(cost, prices)
        .with_concurrency(settings.concurrency)
        .with_currency_label(settings.currency_label.clone());

    let request = ReportRequest::new(subscription_id, resource_ids, options).with_filters(filters);

    let report = retriever.run(&request).await.map_err(|e| {
        error!(error = %e, "Cost report failed");
        anyhow!(e.friendly_message())
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let group = args.resource_group.as_deref().unwrap_or("-");
        print!("{}", render::render_report(&report, group));
    }
    Ok(())
}

async fn price_by_resource(args: PriceByResourceArgs, settings: &Settings) -> Result<()> {
    let key = MeterKey::new(args.location.as_str(), args.service.as_str(), "", args.meter.as_str());
    let filter = price_filter(&key);
    info!(filter = %filter, "Looking up retail prices");

    let client = RetailPriceClient::from_settings(settings)?;
    let items = client
        .prices(&filter)
        .await
        .context("retail price lookup failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    print!("{}", render::render_prices(&items));
    match find_price(&items, &key) {
        Some(best) => println!(
            "\nMatch: {} {} in {} at {} per {}",
            best.service_name,
            best.meter_name,
            best.arm_region_name,
            render::format_amount(best.retail_price),
            best.unit_of_measure
        ),
        None => println!("\nNo exact match for meter '{}'", args.meter),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_of_previous_month() {
        assert_eq!(first_of_previous_month(date(2024, 3, 15)), date(2024, 2, 1));
        assert_eq!(first_of_previous_month(date(2024, 1, 31)), date(2023, 12, 1));
    }

    #[test]
    fn test_cost_by_resource_defaults() {
        let cli = Cli::try_parse_from(["azcost", "cost-by-resource", "-r", "rg-web"]).unwrap();
        let Command::CostByResource(args) = cli.command else {
            panic!("expected cost-by-resource");
        };
        assert_eq!(args.timeframe, Timeframe::BillingMonthToDate);
        assert_eq!(args.metric, MetricType::ActualCost);
        assert!(!args.exclude_meter_details);

        let options = args.query_options(date(2024, 5, 20));
        assert_eq!(options.from, Some(date(2024, 4, 1)));
        assert_eq!(options.to, Some(date(2024, 5, 20)));
        assert_eq!(options.detail, DetailMode::Detailed);
    }

    #[test]
    fn test_cost_by_resource_options() {
        let cli = Cli::try_parse_from([
            "azcost",
            "--debug",
            "cost-by-resource",
            "-i",
            "/subscriptions/s/resourceGroups/rg/providers/x/vm1",
            "-t",
            "Custom",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-31",
            "-m",
            "AmortizedCost",
            "--exclude-meter-details",
            "--filter",
            "env=prod",
            "--filter",
            "ResourceLocation=westeurope;northeurope",
        ])
        .unwrap();
        assert!(cli.debug);

        let Command::CostByResource(args) = cli.command else {
            panic!("expected cost-by-resource");
        };
        assert_eq!(args.timeframe, Timeframe::Custom);
        assert_eq!(args.metric, MetricType::AmortizedCost);
        assert_eq!(args.filters.len(), 2);

        let options = args.query_options(date(2024, 5, 20));
        assert_eq!(options.from, Some(date(2024, 1, 1)));
        assert_eq!(options.detail, DetailMode::Aggregated);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_inverted_custom_period_fails_before_discovery() {
        let cli = Cli::try_parse_from([
            "azcost",
            "cost-by-resource",
            "-r",
            "rg-web",
            "-t",
            "Custom",
            "--from",
            "2024-02-01",
            "--to",
            "2024-01-01",
        ])
        .unwrap();
        let Command::CostByResource(args) = cli.command else {
            panic!("expected cost-by-resource");
        };

        let err = args.prepare(date(2024, 5, 20)).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_malformed_filter_fails_before_discovery() {
        let cli = Cli::try_parse_from(["azcost", "cost-by-resource", "-r", "rg", "--filter", "novalue"])
            .unwrap();
        let Command::CostByResource(args) = cli.command else {
            panic!("expected cost-by-resource");
        };

        assert!(args.prepare(date(2024, 5, 20)).is_err());

        let cli = Cli::try_parse_from(["azcost", "cost-by-resource", "-r", "rg", "--filter", "env=prod"])
            .unwrap();
        let Command::CostByResource(args) = cli.command else {
            panic!("expected cost-by-resource");
        };
        let (_, filters) = args.prepare(date(2024, 5, 20)).unwrap();
        assert_eq!(filters.len(), 1);
    }

    #[test]
    fn test_resource_group_or_id_required() {
        assert!(Cli::try_parse_from(["azcost", "cost-by-resource"]).is_err());
    }

    #[test]
    fn test_unknown_timeframe_is_rejected() {
        assert!(Cli::try_parse_from(["azcost", "cost-by-resource", "-r", "rg", "-t", "Yearly"]).is_err());
    }

    #[test]
    fn test_price_by_resource_defaults_to_any_region() {
        let cli = Cli::try_parse_from([
            "azcost",
            "price-by-resource",
            "--service",
            "Virtual Machines",
            "--meter",
            "B1s",
        ])
        .unwrap();
        let Command::PriceByResource(args) = cli.command else {
            panic!("expected price-by-resource");
        };
        assert_eq!(args.location, UNKNOWN_LOCATION);
    }
}
