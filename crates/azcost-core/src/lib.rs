//! # azcost-core
//!
//! Shared infrastructure for the azcost crates.
//!
//! This crate provides:
//! - [`AzCostError`] - Errors for configuration and logging setup
//! - [`logging`] - Tracing setup (JSON file log plus compact stderr output)
//! - [`config`] - YAML settings for endpoints, timeouts and retries
//!
//! ## Example
//!
//! ```no_run
//! use azcost_core::{config::Settings, logging};
//!
//! fn main() -> azcost_core::Result<()> {
//!     let _guard = logging::init_logging(None, false)?;
//!
//!     let settings = Settings::load(None)?;
//!     tracing::info!(url = %settings.management_url, "using management endpoint");
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;

pub use config::{RetrySettings, Settings};
pub use error::{AzCostError, Result};
pub use logging::{LogGuard, init_logging};
