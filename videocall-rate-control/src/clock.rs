/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Millisecond time sources.

use std::sync::atomic::{AtomicI64, Ordering};
use web_time::Instant;

/// A monotonic, non-decreasing millisecond clock.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall-clock backed source. Time zero is the moment the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX)
    }
}

/// Manually driven clock for tests and offline simulation.
#[derive(Debug, Default)]
pub struct SimulatedClock {
    now_ms: AtomicI64,
}

impl SimulatedClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    /// Move the clock forward. Negative deltas are ignored.
    pub fn advance_ms(&self, delta_ms: i64) {
        if delta_ms > 0 {
            self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
        }
    }

    /// Jump to `time_ms` unless that would move the clock backwards.
    pub fn set_ms(&self, time_ms: i64) {
        self.now_ms.fetch_max(time_ms, Ordering::SeqCst);
    }
}

impl Clock for SimulatedClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_clock_never_goes_backwards() {
        let clock = SimulatedClock::new(1000);
        clock.advance_ms(33);
        assert_eq!(clock.now_ms(), 1033);

        clock.advance_ms(-500);
        assert_eq!(clock.now_ms(), 1033);

        clock.set_ms(900);
        assert_eq!(clock.now_ms(), 1033);

        clock.set_ms(5000);
        assert_eq!(clock.now_ms(), 5000);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now_ms();
        let second = clock.now_ms();
        assert!(first >= 0);
        assert!(second >= first);
    }
}
