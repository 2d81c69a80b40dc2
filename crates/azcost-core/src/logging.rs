//! Tracing setup for the azcost binary.
//!
//! Two sinks are installed: a daily-rotated JSON lines file under
//! `~/.azcost/logs/` and compact human output on stderr. Reports go to
//! stdout, so the console sink never mixes with them.
//!
//! `RUST_LOG` wins over the built-in directives when it is set.
//!
//! ```no_run
//! let _guard = azcost_core::init_logging(None, false).expect("logging init");
//! tracing::debug!(resource_id = "/subscriptions/x/rg/vm1", "querying cost");
//! ```

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{AzCostError, Result};

/// File name prefix of the rotated log files.
const LOG_FILE_PREFIX: &str = "azcost.log";

/// Targets enabled by default; `azcost` also matches the `azcost::*` event targets.
const LOG_TARGETS: &[&str] = &["azcost", "azcost_core", "azcost_api", "azcost_cost"];

/// Keeps the background file writer alive; drop it last to flush.
pub struct LogGuard {
    _file_guard: WorkerGuard,
}

fn default_directives(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn env_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

fn file_writer(log_dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(log_dir).map_err(|e| AzCostError::DirectoryCreation {
        path: log_dir.to_path_buf(),
        source: e,
    })?;
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

/// Install the global subscriber.
///
/// `log_dir` defaults to `~/.azcost/logs/`. `verbose` lowers the default
/// level from INFO to DEBUG and adds source locations to console lines.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };
    let (writer, guard) = file_writer(&log_dir)?;

    let json_file = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .boxed();

    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact()
        .boxed();

    let layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![json_file, stderr];
    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(verbose))
        .init();

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");
    Ok(LogGuard { _file_guard: guard })
}

/// `~/.azcost/`, home of the settings file and the logs.
pub fn azcost_home() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".azcost"))
        .ok_or(AzCostError::HomeNotFound)
}

/// `~/.azcost/logs/`
pub fn default_log_dir() -> Result<PathBuf> {
    Ok(azcost_home()?.join("logs"))
}
