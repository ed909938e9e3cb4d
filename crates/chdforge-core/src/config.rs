//! Application configuration types.
//!
//! Every section defaults sensibly so an empty file is valid. Loading from
//! disk is left to the caller; this module only defines the shape and the
//! validation rules.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Smallest accepted concurrency limit.
pub const MIN_CONCURRENCY: usize = 1;
/// Largest accepted concurrency limit.
pub const MAX_CONCURRENCY: usize = 16;
/// Default number of simultaneously running jobs.
pub const DEFAULT_CONCURRENCY: usize = 2;
/// Name searched for when no tool path is configured.
pub const DEFAULT_TOOL_NAME: &str = "chdman";

/// Clamp a requested concurrency into `[MIN_CONCURRENCY, MAX_CONCURRENCY]`.
pub fn clamp_concurrency(n: usize) -> usize {
    n.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub runner: RunnerConfig,
    pub batch: BatchConfig,
}

impl Config {
    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let c = self.runner.concurrency;
        if c != clamp_concurrency(c) {
            warnings.push(format!(
                "runner.concurrency {c} is outside {MIN_CONCURRENCY}..={MAX_CONCURRENCY}; it will be clamped to {}",
                clamp_concurrency(c)
            ));
        }

        if let Some(ref path) = self.runner.tool_path {
            if !path.as_os_str().is_empty() && !path.exists() {
                warnings.push(format!(
                    "runner.tool_path {} does not exist",
                    path.display()
                ));
            }
        }

        if self.runner.probe_timeout_secs == 0 {
            warnings.push("runner.probe_timeout_secs is 0; probes will always fail".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Supervisor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Path to the chdman executable. `None` or empty means search `PATH`.
    pub tool_path: Option<PathBuf>,
    /// Maximum number of concurrently running jobs (clamped to 1..=16).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// How long `probe` waits for the tool to answer `-help`.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_probe_timeout() -> u64 {
    5
}

impl RunnerConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tool_path: None,
            concurrency: default_concurrency(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

/// Batch driver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Honour each job's `delete_source_after` flag. When false, sources are
    /// always kept.
    pub delete_sources: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delete_sources: true,
        }
    }
}
