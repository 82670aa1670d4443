//! Device event markers and profiling ranges.
//!
//! With the `rocm` feature this module wraps HIP events recorded on the
//! current stream and ROCTX range annotations. Recording is asynchronous:
//! `record` schedules a timestamp capture and returns immediately, and
//! elapsed times are only valid after [`synchronize`] has drained the
//! device. Without the feature, markers capture host clock timestamps and
//! ranges are no-ops, so the rest of the crate behaves identically on
//! machines without a GPU.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("event allocation failed: {0}")]
    AllocationFailed(String),
    #[error("event operation failed: {0}")]
    OperationFailed(String),
    #[error("event was never recorded")]
    NotRecorded,
}

pub type EventResult<T> = Result<T, EventError>;

#[cfg(feature = "rocm")]
mod hip {
    use super::{EventError, EventResult};
    use std::ffi::{c_void, CString};
    use std::os::raw::c_char;
    use std::ptr;

    #[link(name = "amdhip64")]
    extern "C" {
        fn hipEventCreate(event: *mut *mut c_void) -> i32;
        fn hipEventDestroy(event: *mut c_void) -> i32;
        fn hipEventRecord(event: *mut c_void, stream: *mut c_void) -> i32;
        fn hipEventElapsedTime(ms: *mut f32, start: *mut c_void, end: *mut c_void) -> i32;
        fn hipDeviceSynchronize() -> i32;
    }

    #[link(name = "roctx64")]
    extern "C" {
        fn roctxRangePushA(message: *const c_char) -> i32;
        fn roctxRangePop() -> i32;
    }

    pub const HIP_SUCCESS: i32 = 0;

    /// A timestamp marker scheduled for capture on the current stream
    #[derive(Debug)]
    pub struct DeviceEvent {
        raw: *mut c_void,
    }

    impl DeviceEvent {
        pub fn new() -> EventResult<Self> {
            let mut raw: *mut c_void = ptr::null_mut();
            let status = unsafe { hipEventCreate(&mut raw) };
            if status != HIP_SUCCESS {
                return Err(EventError::AllocationFailed(format!(
                    "hipEventCreate failed with code {}",
                    status
                )));
            }
            if raw.is_null() {
                return Err(EventError::AllocationFailed(
                    "hipEventCreate returned null event".to_string(),
                ));
            }
            Ok(DeviceEvent { raw })
        }

        /// Schedule a timestamp capture on the current stream. Non-blocking.
        pub fn record(&mut self) -> EventResult<()> {
            let status = unsafe { hipEventRecord(self.raw, ptr::null_mut()) };
            if status != HIP_SUCCESS {
                return Err(EventError::OperationFailed(format!(
                    "hipEventRecord failed with code {}",
                    status
                )));
            }
            Ok(())
        }

        /// Elapsed milliseconds from `self` to `end`. Both events must have
        /// completed on the device; call [`synchronize`] first.
        pub fn elapsed_ms(&self, end: &DeviceEvent) -> EventResult<f32> {
            let mut ms: f32 = 0.0;
            let status = unsafe { hipEventElapsedTime(&mut ms, self.raw, end.raw) };
            if status != HIP_SUCCESS {
                return Err(EventError::OperationFailed(format!(
                    "hipEventElapsedTime failed with code {}",
                    status
                )));
            }
            Ok(ms)
        }
    }

    impl Drop for DeviceEvent {
        fn drop(&mut self) {
            if !self.raw.is_null() {
                let status = unsafe { hipEventDestroy(self.raw) };
                if status != HIP_SUCCESS {
                    tracing::warn!("hipEventDestroy failed with code {}", status);
                }
            }
        }
    }

    // SAFETY: HIP events may be recorded and queried from any host thread.
    unsafe impl Send for DeviceEvent {}

    /// Block until all previously scheduled device work has completed.
    pub fn synchronize() -> EventResult<()> {
        let status = unsafe { hipDeviceSynchronize() };
        if status != HIP_SUCCESS {
            return Err(EventError::OperationFailed(format!(
                "hipDeviceSynchronize failed with code {}",
                status
            )));
        }
        Ok(())
    }

    /// Push a named ROCTX range. Names with interior NULs are skipped.
    pub fn range_push(name: &str) {
        if let Ok(name) = CString::new(name) {
            unsafe {
                roctxRangePushA(name.as_ptr());
            }
        }
    }

    /// Pop the most recently pushed ROCTX range.
    pub fn range_pop() {
        unsafe {
            roctxRangePop();
        }
    }
}

#[cfg(not(feature = "rocm"))]
mod host {
    use super::{EventError, EventResult};
    use std::time::Instant;

    /// Host clock fallback for [`DeviceEvent`]: captures an `Instant` at
    /// record time instead of scheduling a device timestamp.
    #[derive(Debug)]
    pub struct DeviceEvent {
        recorded_at: Option<Instant>,
    }

    impl DeviceEvent {
        pub fn new() -> EventResult<Self> {
            Ok(DeviceEvent { recorded_at: None })
        }

        pub fn record(&mut self) -> EventResult<()> {
            self.recorded_at = Some(Instant::now());
            Ok(())
        }

        pub fn elapsed_ms(&self, end: &DeviceEvent) -> EventResult<f32> {
            let start = self.recorded_at.ok_or(EventError::NotRecorded)?;
            let end = end.recorded_at.ok_or(EventError::NotRecorded)?;
            // Recording out of order reads as zero elapsed, matching the
            // "caller contract, not runtime-checked" ordering rule.
            let elapsed = end.checked_duration_since(start).unwrap_or_default();
            Ok(elapsed.as_secs_f32() * 1_000.0)
        }
    }

    pub fn synchronize() -> EventResult<()> {
        Ok(())
    }

    pub fn range_push(_name: &str) {}

    pub fn range_pop() {}
}

#[cfg(feature = "rocm")]
pub use hip::{range_pop, range_push, synchronize, DeviceEvent};

#[cfg(not(feature = "rocm"))]
pub use host::{range_pop, range_push, synchronize, DeviceEvent};
