//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - `graphcore.toml` (default configuration)
//! - `graphcore.local.toml` (git-ignored local overrides)
//! - Environment variables (`GRAPHCORE_*` prefix)
//!
//! ## Example
//!
//! ```toml
//! # graphcore.toml
//! [storage]
//! max_retries = 3
//!
//! [optimizer]
//! max_iterations = 16
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! GRAPHCORE_STORAGE__MAX_RETRIES=5
//! GRAPHCORE_EXECUTOR__MEMORY_HIGH_WATER_MARK_BYTES=1073741824
//! ```

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageClientConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage client façade configuration (spec §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageClientConfig {
    /// Retry budget for a single part's RPC on leader-change/timeout. The
    /// spec leaves the exact budget unspecified and asks for a documented
    /// default (spec §9 open question) — three retries, matching the
    /// typical leader-election settle time of a Raft group.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-RPC timeout before the storage client treats a part as failed.
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,

    /// Maximum parts dispatched concurrently per logical request.
    #[serde(default = "default_max_concurrent_parts")]
    pub max_concurrent_parts: usize,
}

fn default_max_retries() -> u32 {
    3
}
fn default_rpc_timeout_ms() -> u64 {
    5_000
}
fn default_max_concurrent_parts() -> usize {
    64
}

impl Default for StorageClientConfig {
    fn default() -> Self {
        StorageClientConfig {
            max_retries: default_max_retries(),
            rpc_timeout_ms: default_rpc_timeout_ms(),
            max_concurrent_parts: default_max_concurrent_parts(),
        }
    }
}

/// Rule-based optimizer configuration (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Safety iteration cap for the bottom-up fixed-point rewrite loop.
    #[serde(default = "default_optimizer_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_true")]
    pub enable_filter_pushdown: bool,

    #[serde(default = "default_true")]
    pub enable_index_selection: bool,

    #[serde(default = "default_true")]
    pub enable_topn_pushdown: bool,
}

fn default_optimizer_iterations() -> usize {
    16
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            max_iterations: default_optimizer_iterations(),
            enable_filter_pushdown: true,
            enable_index_selection: true,
            enable_topn_pushdown: true,
        }
    }
}

/// Executor runtime configuration (spec §4.5 / §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Optional per-query memory high-water mark; `None` disables tracking.
    #[serde(default)]
    pub memory_high_water_mark_bytes: Option<usize>,

    /// Optional wall-clock query timeout; external cancels use the same
    /// mechanism (spec §4.5 "Timeouts are implemented as external cancels").
    #[serde(default)]
    pub default_timeout_ms: Option<u64>,

    /// Maximum result-cache entries retained per query context.
    #[serde(default = "default_result_cache_entries")]
    pub result_cache_capacity: usize,
}

fn default_result_cache_entries() -> usize {
    256
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            memory_high_water_mark_bytes: None,
            default_timeout_ms: None,
            result_cache_capacity: default_result_cache_entries(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Merges in order:
    /// 1. `graphcore.toml` (base configuration)
    /// 2. `graphcore.local.toml` (local overrides, git-ignored)
    /// 3. Environment variables (`GRAPHCORE_*` prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("graphcore.toml"))
            .merge(Toml::file("graphcore.local.toml"))
            .merge(Env::prefixed("GRAPHCORE_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path.
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("GRAPHCORE_").split("__"))
            .extract()
    }
}

/// Installs the global `tracing` subscriber per `logging` configuration.
/// Idempotent: a second call is a no-op if a subscriber is already set.
pub fn init_tracing(logging: &LoggingConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if logging.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        tracing::debug!("tracing subscriber already initialized: {e}");
    }
}
