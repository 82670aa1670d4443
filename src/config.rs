//! Profiler configuration.
//!
//! Environment variables are read once, at the program entry point, via
//! [`ProfilerConfig::from_env`]. Everything downstream takes an explicit
//! `&ProfilerConfig` so tests can construct configurations directly.

use std::env;
use std::path::PathBuf;

/// Environment variable enabling ROCTX profiling ranges (`"1"` enables)
pub const ENABLE_RANGES_ENV: &str = "NVTE_ENABLE_NVTX";

/// Environment variable carrying the distributed rank
pub const RANK_ENV: &str = "RANK";

/// Environment variable carrying the node-local rank
pub const LOCAL_RANK_ENV: &str = "LOCAL_RANK";

/// Environment variable carrying the base directory for timer logs
pub const LOG_PATH_ENV: &str = "NVTE_LOG_PATH";

/// Rank value used when the corresponding variable is unset
pub const DEFAULT_RANK: i32 = -1;

/// Configuration for event timers and registry output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilerConfig {
    /// Emit a ROCTX range around each timed region
    pub emit_ranges: bool,
    /// Distributed rank, used only to namespace the output file
    pub rank: i32,
    /// Node-local rank, used only to namespace the output file
    pub local_rank: i32,
    /// Base directory for the timer log; output fails if unset
    pub log_path: Option<PathBuf>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        ProfilerConfig {
            emit_ranges: false,
            rank: DEFAULT_RANK,
            local_rank: DEFAULT_RANK,
            log_path: None,
        }
    }
}

impl ProfilerConfig {
    /// Build a configuration from the process environment.
    pub fn from_env() -> Self {
        ProfilerConfig {
            emit_ranges: ranges_enabled(env::var(ENABLE_RANGES_ENV).ok().as_deref()),
            rank: parse_rank(env::var(RANK_ENV).ok().as_deref()),
            local_rank: parse_rank(env::var(LOCAL_RANK_ENV).ok().as_deref()),
            log_path: parse_log_path(env::var(LOG_PATH_ENV).ok().as_deref()),
        }
    }

    /// Set the base directory for the timer log
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Set rank and local rank
    pub fn with_ranks(mut self, rank: i32, local_rank: i32) -> Self {
        self.rank = rank;
        self.local_rank = local_rank;
        self
    }
}

/// Ranges are enabled only by the exact value `"1"`.
fn ranges_enabled(value: Option<&str>) -> bool {
    value == Some("1")
}

fn parse_rank(value: Option<&str>) -> i32 {
    value
        .and_then(|s| s.trim().parse::<i32>().ok())
        .unwrap_or(DEFAULT_RANK)
}

/// An unset or empty log path means "not configured".
fn parse_log_path(value: Option<&str>) -> Option<PathBuf> {
    value.filter(|s| !s.is_empty()).map(PathBuf::from)
}
