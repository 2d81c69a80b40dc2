//! Subscription and resource discovery through the Azure CLI.

use std::process::Stdio;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Account {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Resource {
    id: String,
}

/// Thin wrapper over the `az` executable.
#[derive(Debug, Clone)]
pub struct AzCli {
    binary: String,
}

impl Default for AzCli {
    fn default() -> Self {
        Self {
            binary: "az".to_string(),
        }
    }
}

impl AzCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the CLI's current subscription.
    pub async fn default_subscription(&self) -> Result<String> {
        let output = self.run(&["account", "show", "--output", "json"]).await?;
        parse_subscription_id(&output)
    }

    /// Ids of every resource in a resource group.
    pub async fn resource_ids(&self, subscription_id: &str, resource_group: &str) -> Result<Vec<String>> {
        let output = self
            .run(&[
                "resource",
                "list",
                "--subscription",
                subscription_id,
                "--resource-group",
                resource_group,
                "--output",
                "json",
            ])
            .await?;
        let ids = parse_resource_ids(&output)?;
        debug!(resource_group, count = ids.len(), "Discovered resources");
        Ok(ids)
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!(binary = %self.binary, ?args, "Running Azure CLI");

        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("failed to run '{}'. Is the Azure CLI installed?", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("'{} {}' failed: {}", self.binary, args.join(" "), stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// `id` from `az account show` output.
pub fn parse_subscription_id(output: &str) -> Result<String> {
    let account: Account =
        serde_json::from_str(output).context("unexpected 'az account show' output")?;
    if account.id.trim().is_empty() {
        bail!("'az account show' returned an empty subscription id");
    }
    Ok(account.id)
}

/// `[].id` from `az resource list` output, in CLI order.
pub fn parse_resource_ids(output: &str) -> Result<Vec<String>> {
    let resources: Vec<Resource> =
        serde_json::from_str(output).context("unexpected 'az resource list' output")?;
    Ok(resources.into_iter().map(|r| r.id).collect())
}
