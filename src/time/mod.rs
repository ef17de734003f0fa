// SPDX-FileCopyrightText: The midiview authors
// SPDX-License-Identifier: MPL-2.0

//! Sources of the current time
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use thiserror::Error;


#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum TimeError {
    #[error("time cannot go backwards (delta = {delta} s)")]
    NegativeDelta { delta: f64 },

    #[error("time must not be negative (time = {time} s)")]
    NegativeTime { time: f64 },
}

/// Capability to read the current time.
pub trait TimeSource {
    /// Current time in seconds.
    ///
    /// The epoch is defined by the implementation. Reading the time
    /// must neither block nor have side effects.
    #[must_use]
    fn current_time(&self) -> f64;
}

impl<T> TimeSource for &T
where
    T: TimeSource + ?Sized,
{
    fn current_time(&self) -> f64 {
        (**self).current_time()
    }
}

impl<T> TimeSource for Arc<T>
where
    T: TimeSource + ?Sized,
{
    fn current_time(&self) -> f64 {
        (**self).current_time()
    }
}

/// Monotonic wall clock.
///
/// Seconds are counted from the construction of the instance.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn current_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Atomic f64 value with limited functionality.
#[derive(Debug)]
#[repr(transparent)]
struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    fn load(&self, ordering: Ordering) -> f64 {
        f64::from_bits(self.bits.load(ordering))
    }

    fn store(&self, value: f64, ordering: Ordering) {
        self.bits.store(value.to_bits(), ordering);
    }
}

/// Manually controlled clock.
///
/// Starts at 0.0 and never advances on its own.
///
/// The value is stored atomically only to allow sharing the clock with
/// callbacks that must be `Send`, e.g. an [`crate::ActivityMonitor`]
/// registered at a device. All mutations are supposed to be issued
/// from a single thread: [`Self::advance_time()`] is a load followed
/// by a store and concurrent writers will lose updates.
#[derive(Debug)]
pub struct SimulatedTimeSource {
    time: AtomicF64,
}

impl SimulatedTimeSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            time: AtomicF64::new(0.0),
        }
    }

    /// Move the time forward.
    ///
    /// Negative deltas are rejected and leave the time unchanged.
    pub fn advance_time(&self, delta: f64) -> Result<(), TimeError> {
        if delta.is_nan() || delta < 0.0 {
            return Err(TimeError::NegativeDelta { delta });
        }
        let time = self.time.load(Ordering::Acquire) + delta;
        self.time.store(time, Ordering::Release);
        Ok(())
    }

    /// Jump to an arbitrary point in time, possibly backwards.
    pub fn set_time(&self, time: f64) -> Result<(), TimeError> {
        if time.is_nan() || time < 0.0 {
            return Err(TimeError::NegativeTime { time });
        }
        self.time.store(time, Ordering::Release);
        Ok(())
    }

    /// Rewind the time to 0.0.
    pub fn reset(&self) {
        self.time.store(0.0, Ordering::Release);
    }
}

impl Default for SimulatedTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SimulatedTimeSource {
    fn current_time(&self) -> f64 {
        self.time.load(Ordering::Acquire)
    }
}
