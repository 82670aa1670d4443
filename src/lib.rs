//! hipmark - GPU event timers for training-loop instrumentation
//!
//! This crate measures elapsed device time of named code regions across
//! training iterations and flushes the results to a per-rank log file.
//! Timestamps are captured with HIP events recorded on the current stream,
//! so timing reflects device execution rather than host-side scheduling.
//! Optionally each timed region is bracketed by a ROCTX profiling range so
//! it shows up in external timeline tools.
//!
//! # Modules
//!
//! - [`config`] - Explicit profiler configuration, sourced from the
//!   environment at the program entry point
//! - [`event`] - Device event markers, synchronization, and profiling ranges
//! - [`timer`] - [`EventTimer`] and the RAII [`ScopedTimer`]
//! - [`registry`] - [`TimerRegistry`], per-iteration aggregation and log output
//!
//! # Example
//!
//! ```
//! use hipmark::{EventTimer, ProfilerConfig, TimerRegistry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProfilerConfig::default();
//! let mut registry = TimerRegistry::new();
//!
//! let mut timer = EventTimer::new("matmul", &config)?;
//! timer.start()?;
//! // ... launch kernels ...
//! timer.stop()?;
//! registry.append(timer);
//!
//! registry.set_iteration(1);
//! // ... next training step ...
//! # Ok(())
//! # }
//! ```
//!
//! At shutdown, `registry.output(&config)` synchronizes the device and
//! appends one `<iteration> <name> <elapsed_ms>` line per recorded timer to
//! `<NVTE_LOG_PATH>/NVTE_TP_<RANK>_<LOCAL_RANK>.txt`.
//!
//! # GPU backend
//!
//! The `rocm` feature links against `amdhip64` and `roctx64` and records
//! real device events. Without it, markers fall back to host clock
//! timestamps so the full pipeline is testable on machines without a GPU.

pub mod config;
pub mod event;
pub mod registry;
pub mod timer;

pub use config::ProfilerConfig;
pub use event::EventError;
pub use registry::{OutputError, TimerRegistry};
pub use timer::{EventTimer, ScopedTimer};
