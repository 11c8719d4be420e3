use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// ClarityConfig
// ---------------------------------------------------------------------------

/// Tunables for the history walker and step router, loadable from YAML.
/// Connection settings (host, credentials) are not configuration — they
/// come from the environment of the calling script.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClarityConfig {
    #[serde(default)]
    pub walker: WalkerConfig,
    #[serde(default)]
    pub router: RouterConfig,
}

impl ClarityConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

// ---------------------------------------------------------------------------
// WalkerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkerConfig {
    /// How many per-artifact backward walks run at once.
    #[serde(default = "default_walker_concurrency")]
    pub concurrency: usize,
    /// Hop bound per walk; exceeding it means the history is corrupt or
    /// cyclic and the walk errors instead of running forever.
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
}

fn default_walker_concurrency() -> usize {
    8
}

fn default_max_hops() -> usize {
    100
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_walker_concurrency(),
            max_hops: default_max_hops(),
        }
    }
}

// ---------------------------------------------------------------------------
// RouterConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Uris per routing request. Sized so one request finishes well inside
    /// the service timeout regardless of total queue depth.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// How many batch submissions are in flight at once.
    #[serde(default = "default_router_concurrency")]
    pub concurrency: usize,
    /// Retries per batch on transient failure before the batch is reported
    /// as failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_batch_size() -> usize {
    50
}

fn default_router_concurrency() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    15_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            concurrency: default_router_concurrency(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
