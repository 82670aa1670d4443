//! Named region timers.
//!
//! An [`EventTimer`] owns a start/end marker pair for one code region.
//! `start` and `stop` schedule timestamp captures on the current stream and
//! return immediately; the elapsed value becomes valid only after device
//! synchronization (normally performed by `TimerRegistry::output`).

use std::sync::Mutex;

use crate::config::ProfilerConfig;
use crate::event::{self, DeviceEvent, EventResult};
use crate::registry::TimerRegistry;

/// Measures elapsed device time for one named code region.
///
/// Names are not required to be unique; every timer instance produces its
/// own output line. Calling `start` or `stop` twice overwrites the prior
/// marker.
#[derive(Debug)]
pub struct EventTimer {
    name: String,
    start: DeviceEvent,
    end: DeviceEvent,
    emit_ranges: bool,
}

impl EventTimer {
    /// Allocate the marker pair for a named region. The range flag is
    /// captured from `config` at construction and fixed for the lifetime of
    /// the timer.
    pub fn new(name: impl Into<String>, config: &ProfilerConfig) -> EventResult<Self> {
        Ok(EventTimer {
            name: name.into(),
            start: DeviceEvent::new()?,
            end: DeviceEvent::new()?,
            emit_ranges: config.emit_ranges,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open the region: push the profiling range (if enabled), then record
    /// the start marker. Non-blocking.
    pub fn start(&mut self) -> EventResult<()> {
        if self.emit_ranges {
            event::range_push(&self.name);
        }
        self.start.record()
    }

    /// Close the region: record the end marker, then pop the profiling
    /// range (if enabled). Must follow `start` on the same instance; range
    /// nesting relative to other live timers is the caller's responsibility.
    pub fn stop(&mut self) -> EventResult<()> {
        self.end.record()?;
        if self.emit_ranges {
            event::range_pop();
        }
        Ok(())
    }

    /// Elapsed milliseconds between the recorded markers. Valid only after
    /// both markers have completed on the device.
    pub fn elapsed_ms(&self) -> EventResult<f32> {
        self.start.elapsed_ms(&self.end)
    }
}

/// RAII region timer: starts on construction, stops and registers itself
/// when dropped.
///
/// Failures while closing the region cannot propagate out of `Drop` and are
/// logged instead.
#[derive(Debug)]
pub struct ScopedTimer<'a> {
    timer: Option<EventTimer>,
    registry: &'a Mutex<TimerRegistry>,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(
        name: impl Into<String>,
        config: &ProfilerConfig,
        registry: &'a Mutex<TimerRegistry>,
    ) -> EventResult<Self> {
        let mut timer = EventTimer::new(name, config)?;
        timer.start()?;
        Ok(ScopedTimer {
            timer: Some(timer),
            registry,
        })
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            if let Err(e) = timer.stop() {
                tracing::warn!("failed to stop timer {}: {}", timer.name(), e);
                return;
            }
            match self.registry.lock() {
                Ok(mut registry) => registry.append(timer),
                Err(_) => tracing::warn!("timer registry lock poisoned, dropping {}", timer.name()),
            }
        }
    }
}
