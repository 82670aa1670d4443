//! Per-iteration timer aggregation and log output.
//!
//! The registry is an append-only log of timers keyed by training
//! iteration. Buckets appear in first-use order and are never cleared, so
//! repeated `output` calls re-emit the full history. The registry performs
//! no internal locking; the process-wide instance behind [`global`] wraps
//! one registry in a `Mutex` for callers that need the shared accumulator.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::config::ProfilerConfig;
use crate::event::{self, EventError};
use crate::timer::EventTimer;

/// File name prefix for per-rank timer logs
const LOG_FILE_PREFIX: &str = "NVTE_TP";

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("NVTE_LOG_PATH is not set")]
    LogPathUnset,
    #[error(transparent)]
    Event(#[from] EventError),
    #[error("failed to write timer log: {0}")]
    Io(#[from] std::io::Error),
}

/// Aggregates [`EventTimer`]s by iteration and persists them.
///
/// A timer belongs to the bucket that `current_iteration` names at the
/// moment it is appended, not at construction time.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    current_iteration: i64,
    // Buckets in first-appearance order of their iteration key, each
    // holding timers in append order.
    buckets: Vec<(i64, Vec<EventTimer>)>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        TimerRegistry::default()
    }

    pub fn current_iteration(&self) -> i64 {
        self.current_iteration
    }

    /// Overwrite the iteration cursor. No monotonicity requirement: setting
    /// a previously used value merges further appends into that bucket.
    pub fn set_iteration(&mut self, iteration: i64) {
        self.current_iteration = iteration;
    }

    /// Append a timer to the current iteration's bucket.
    pub fn append(&mut self, timer: EventTimer) {
        self.current_bucket().push(timer);
    }

    /// Append every timer in order to the current iteration's bucket.
    pub fn extend(&mut self, timers: impl IntoIterator<Item = EventTimer>) {
        self.current_bucket().extend(timers);
    }

    /// Total number of recorded timers across all iterations.
    pub fn timer_count(&self) -> usize {
        self.buckets.iter().map(|(_, timers)| timers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|(_, timers)| timers.is_empty())
    }

    /// All recorded timers with their iteration, in output order.
    pub fn records(&self) -> impl Iterator<Item = (i64, &EventTimer)> + '_ {
        self.buckets
            .iter()
            .flat_map(|(iteration, timers)| timers.iter().map(move |t| (*iteration, t)))
    }

    /// Synchronize the device and append every recorded timing to the
    /// per-rank log file under `config.log_path`.
    ///
    /// Fails with [`OutputError::LogPathUnset`] before touching the
    /// filesystem if no log path is configured. Recorded timers are kept:
    /// calling `output` again re-emits the full history.
    pub fn output(&self, config: &ProfilerConfig) -> Result<(), OutputError> {
        // Elapsed times are only valid once all pending marker recordings
        // have completed on the device.
        event::synchronize()?;

        let base = config
            .log_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(OutputError::LogPathUnset)?;
        let file_path = log_file_path(base.to_path_buf(), config.rank, config.local_rank)?;

        tracing::debug!(
            path = %file_path.display(),
            timers = self.timer_count(),
            "flushing event timers"
        );

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;
        let mut writer = BufWriter::new(file);
        self.write_records(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn write_records<W: Write>(&self, out: &mut W) -> Result<(), OutputError> {
        for (iteration, timer) in self.records() {
            writeln!(out, "{} {} {}", iteration, timer.name(), timer.elapsed_ms()?)?;
        }
        Ok(())
    }

    fn current_bucket(&mut self) -> &mut Vec<EventTimer> {
        let iteration = self.current_iteration;
        let idx = match self.buckets.iter().position(|(i, _)| *i == iteration) {
            Some(idx) => idx,
            None => {
                self.buckets.push((iteration, Vec::new()));
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[idx].1
    }
}

/// `<base>/NVTE_TP_<rank>_<local_rank>.txt`, resolved to an absolute path.
fn log_file_path(base: PathBuf, rank: i32, local_rank: i32) -> std::io::Result<PathBuf> {
    let path = base.join(format!("{}_{}_{}.txt", LOG_FILE_PREFIX, rank, local_rank));
    std::path::absolute(path)
}

/// Process-wide shared registry
static GLOBAL_REGISTRY: Lazy<Mutex<TimerRegistry>> =
    Lazy::new(|| Mutex::new(TimerRegistry::new()));

/// The process-wide registry. Prefer an explicit [`TimerRegistry`] where
/// call sites can share one; this accessor exists for instrumentation
/// scattered across a training loop.
pub fn global() -> &'static Mutex<TimerRegistry> {
    &GLOBAL_REGISTRY
}
