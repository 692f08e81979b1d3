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

//! Estimates the incoming frame rate from recent frame arrival times.

use crate::config::RateControlConfig;
use crate::Result;

#[derive(Debug, Clone)]
pub struct FrameRateEstimator {
    // Arrival times in milliseconds, newest first. `None` marks an unused slot.
    arrivals: Vec<Option<i64>>,
    // Arrivals older than this (relative to the query time) are ignored.
    max_age_ms: i64,
    // The most recently computed estimate in frames per second.
    rate_fps: f32,
}

impl Default for FrameRateEstimator {
    fn default() -> Self {
        Self::from_validated(&RateControlConfig::default())
    }
}

impl FrameRateEstimator {
    /// Create an empty estimator, rejecting configs it cannot estimate with.
    pub fn new(config: &RateControlConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    pub(crate) fn from_validated(config: &RateControlConfig) -> Self {
        Self {
            arrivals: vec![None; config.history_size],
            max_age_ms: config.max_age_ms,
            rate_fps: 0.0,
        }
    }

    /// Forget all arrivals and zero the estimate.
    pub fn reset(&mut self) {
        self.arrivals.fill(None);
        self.rate_fps = 0.0;
    }

    /// Record a frame arrival at `now_ms`.
    pub fn record_arrival(&mut self, now_ms: i64) {
        // The very first arrival lands in slot 0 without shifting.
        if self.arrivals[0].is_some() {
            self.arrivals.rotate_right(1);
        }
        self.arrivals[0] = Some(now_ms);
    }

    /// Recompute the estimate as seen from `now_ms` and return it.
    ///
    /// Walks from the second newest arrival towards older ones until it hits
    /// an unused slot or an arrival older than the max-age window. The rate
    /// is the number of intervals walked over the time they span. Fewer than
    /// two usable arrivals, or a span that is not positive, yield 0.
    pub fn estimate(&mut self, now_ms: i64) -> f32 {
        self.rate_fps = self.compute(now_ms);
        self.rate_fps
    }

    /// Record an arrival and recompute the estimate at the same instant.
    pub fn update(&mut self, now_ms: i64) -> f32 {
        self.record_arrival(now_ms);
        self.estimate(now_ms)
    }

    fn compute(&self, now_ms: i64) -> f32 {
        let Some(newest) = self.arrivals[0] else {
            return 0.0;
        };

        let mut frames: u32 = 0;
        let mut oldest = newest;
        // The last slot only ever holds data that is about to be evicted.
        let scan_end = self.arrivals.len() - 1;
        for arrival in &self.arrivals[1..scan_end] {
            match *arrival {
                Some(time_ms) if now_ms - time_ms <= self.max_age_ms => {
                    frames += 1;
                    oldest = time_ms;
                }
                _ => break,
            }
        }

        if frames == 0 {
            return 0.0;
        }

        let span_ms = newest - oldest;
        if span_ms <= 0 {
            return 0.0;
        }
        frames as f32 * 1000.0 / span_ms as f32
    }

    /// The most recently computed estimate, without recomputing it.
    pub fn rate_fps(&self) -> f32 {
        self.rate_fps
    }

    /// The most recently computed estimate rounded to whole frames per second.
    pub fn rounded_rate_fps(&self) -> u32 {
        round_fps(self.rate_fps)
    }

    /// Number of arrivals currently held in the history.
    pub fn sample_count(&self) -> usize {
        self.arrivals.iter().take_while(|a| a.is_some()).count()
    }

    pub fn capacity(&self) -> usize {
        self.arrivals.len()
    }
}

/// Round half up, saturating at `u32::MAX`.
pub(crate) fn round_fps(rate_fps: f32) -> u32 {
    // Float to int `as` casts saturate and map NaN to 0.
    (rate_fps + 0.5).floor().min(u32::MAX as f32) as u32
}
