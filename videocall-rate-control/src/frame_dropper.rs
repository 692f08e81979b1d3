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

//! Byte-budget admission for encoded frames.

use serde::{Deserialize, Serialize};

/// Tracks how far encoder output runs ahead of the target bitrate and decides
/// whether the next frame should be skipped.
///
/// Implementations need not be thread safe. [`crate::MediaOptimizer`]
/// serializes every call.
pub trait FrameDropper {
    /// Clear accumulated debt and rates.
    fn reset(&mut self);
    /// Reconfigure the target the budget is measured against.
    fn set_rates(&mut self, bitrate_kbps: f32, frame_rate_fps: f32);
    /// Account for an encoded frame of `frame_size_bytes`.
    fn fill(&mut self, frame_size_bytes: usize, is_delta_frame: bool);
    /// Replenish one frame interval of budget at the given input frame rate.
    fn leak(&mut self, input_frame_rate_fps: u32);
    /// Whether the next frame should be dropped.
    fn should_drop_frame(&mut self) -> bool;
    /// Soft on/off switch. Accumulated state survives toggling.
    fn enable(&mut self, enable: bool);
}

impl<D: FrameDropper + ?Sized> FrameDropper for Box<D> {
    fn reset(&mut self) {
        (**self).reset()
    }
    fn set_rates(&mut self, bitrate_kbps: f32, frame_rate_fps: f32) {
        (**self).set_rates(bitrate_kbps, frame_rate_fps)
    }
    fn fill(&mut self, frame_size_bytes: usize, is_delta_frame: bool) {
        (**self).fill(frame_size_bytes, is_delta_frame)
    }
    fn leak(&mut self, input_frame_rate_fps: u32) {
        (**self).leak(input_frame_rate_fps)
    }
    fn should_drop_frame(&mut self) -> bool {
        (**self).should_drop_frame()
    }
    fn enable(&mut self, enable: bool) {
        (**self).enable(enable)
    }
}

/// Configuration for [`LeakyBucketDropper`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeakyBucketConfig {
    /// Seconds of target bitrate the bucket may hold before frames are dropped
    pub window_secs: f32,
    /// Number of leaks over which the part of a key frame exceeding one
    /// frame interval is charged
    pub key_frame_spread_frames: u32,
}

impl Default for LeakyBucketConfig {
    fn default() -> Self {
        Self {
            window_secs: 1.0,
            key_frame_spread_frames: 10,
        }
    }
}

/// Leaky bucket measured in kilobits.
///
/// Encoded frames pour into the bucket, every frame interval drains one
/// interval's worth of the target bitrate. Once the content exceeds
/// `window_secs` of target bitrate, frames are dropped until it drains.
#[derive(Debug, Clone)]
pub struct LeakyBucketDropper {
    config: LeakyBucketConfig,
    accumulator_kbits: f32,
    max_accumulator_kbits: f32,
    target_bitrate_kbps: f32,
    frame_rate_fps: f32,
    // Key frame cost not yet charged to the accumulator.
    key_frame_excess_kbits: f32,
    key_frame_leaks_remaining: u32,
    enabled: bool,
}

impl Default for LeakyBucketDropper {
    fn default() -> Self {
        Self::new(LeakyBucketConfig::default())
    }
}

impl LeakyBucketDropper {
    pub fn new(config: LeakyBucketConfig) -> Self {
        Self {
            config,
            accumulator_kbits: 0.0,
            max_accumulator_kbits: 0.0,
            target_bitrate_kbps: 0.0,
            frame_rate_fps: 0.0,
            key_frame_excess_kbits: 0.0,
            key_frame_leaks_remaining: 0,
            enabled: true,
        }
    }

    /// Current debt in kilobits.
    pub fn accumulator_kbits(&self) -> f32 {
        self.accumulator_kbits
    }

    /// Debt level above which frames are dropped.
    pub fn max_accumulator_kbits(&self) -> f32 {
        self.max_accumulator_kbits
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn per_frame_budget_kbits(&self, frame_rate_fps: f32) -> f32 {
        if frame_rate_fps > 0.0 {
            self.target_bitrate_kbps / frame_rate_fps
        } else {
            0.0
        }
    }
}

impl FrameDropper for LeakyBucketDropper {
    fn reset(&mut self) {
        self.accumulator_kbits = 0.0;
        self.max_accumulator_kbits = 0.0;
        self.target_bitrate_kbps = 0.0;
        self.frame_rate_fps = 0.0;
        self.key_frame_excess_kbits = 0.0;
        self.key_frame_leaks_remaining = 0;
    }

    fn set_rates(&mut self, bitrate_kbps: f32, frame_rate_fps: f32) {
        let bitrate_kbps = bitrate_kbps.max(0.0);
        // Debt accrued against a higher target is worth proportionally more
        // against a lower one.
        if self.target_bitrate_kbps > 0.0 && bitrate_kbps < self.target_bitrate_kbps {
            self.accumulator_kbits *= bitrate_kbps / self.target_bitrate_kbps;
        }
        self.target_bitrate_kbps = bitrate_kbps;
        self.frame_rate_fps = frame_rate_fps.max(0.0);
        self.max_accumulator_kbits = bitrate_kbps * self.config.window_secs;
    }

    fn fill(&mut self, frame_size_bytes: usize, is_delta_frame: bool) {
        if !self.enabled {
            return;
        }
        let frame_kbits = frame_size_bytes as f32 * 8.0 / 1000.0;
        let per_frame_kbits = self.per_frame_budget_kbits(self.frame_rate_fps);

        if !is_delta_frame
            && self.config.key_frame_spread_frames > 0
            && per_frame_kbits > 0.0
            && frame_kbits > per_frame_kbits
        {
            self.accumulator_kbits += per_frame_kbits;
            self.key_frame_excess_kbits += frame_kbits - per_frame_kbits;
            self.key_frame_leaks_remaining = self.config.key_frame_spread_frames;
        } else {
            self.accumulator_kbits += frame_kbits;
        }
    }

    fn leak(&mut self, input_frame_rate_fps: u32) {
        if !self.enabled || input_frame_rate_fps == 0 {
            return;
        }
        self.accumulator_kbits -= self.per_frame_budget_kbits(input_frame_rate_fps as f32);

        if self.key_frame_leaks_remaining > 0 {
            let slice = self.key_frame_excess_kbits / self.key_frame_leaks_remaining as f32;
            self.accumulator_kbits += slice;
            self.key_frame_excess_kbits -= slice;
            self.key_frame_leaks_remaining -= 1;
        }

        self.accumulator_kbits = self.accumulator_kbits.max(0.0);
    }

    fn should_drop_frame(&mut self) -> bool {
        if !self.enabled || self.target_bitrate_kbps <= 0.0 {
            return false;
        }
        self.accumulator_kbits > self.max_accumulator_kbits
    }

    fn enable(&mut self, enable: bool) {
        self.enabled = enable;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn configured(bitrate_kbps: f32, frame_rate_fps: f32) -> LeakyBucketDropper {
        let mut dropper = LeakyBucketDropper::default();
        dropper.set_rates(bitrate_kbps, frame_rate_fps);
        dropper
    }

    #[test]
    fn unconfigured_dropper_never_drops() {
        let mut dropper = LeakyBucketDropper::default();
        dropper.fill(1_000_000, true);
        assert!(!dropper.should_drop_frame());
    }

    #[test]
    fn frames_within_budget_are_kept() {
        // 300 kbps at 30 fps: 10 kbit (1250 bytes) per frame.
        let mut dropper = configured(300.0, 30.0);
        for _ in 0..300 {
            dropper.leak(30);
            assert!(!dropper.should_drop_frame());
            dropper.fill(1250, true);
        }
        assert!(dropper.accumulator_kbits() <= 10.0 + 1e-3);
    }

    #[test]
    fn overshoot_drops_until_drained() {
        let mut dropper = configured(300.0, 30.0);
        // 400 kbit against a 300 kbit bucket.
        dropper.fill(50_000, true);
        assert!(dropper.should_drop_frame());

        let mut leaks = 0;
        while dropper.should_drop_frame() {
            dropper.leak(30);
            leaks += 1;
        }
        // 100 kbit over the limit drains at 10 kbit per leak.
        assert_eq!(leaks, 10);
    }

    #[test]
    fn key_frame_cost_is_spread() {
        let mut dropper = configured(300.0, 30.0);
        dropper.fill(10_000, false); // 80 kbit key frame
        assert_relative_eq!(dropper.accumulator_kbits(), 10.0, epsilon = 1e-3);

        // Each of the next 10 leaks drains 10 kbit and charges 7 kbit.
        dropper.leak(30);
        assert_relative_eq!(dropper.accumulator_kbits(), 7.0, epsilon = 1e-3);
        for _ in 0..9 {
            dropper.leak(30);
        }
        assert_relative_eq!(dropper.accumulator_kbits(), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn disabled_dropper_keeps_debt_and_never_drops() {
        let mut dropper = configured(300.0, 30.0);
        dropper.fill(50_000, true);
        let debt = dropper.accumulator_kbits();

        dropper.enable(false);
        dropper.leak(30);
        dropper.fill(50_000, true);
        assert!(!dropper.should_drop_frame());
        assert_relative_eq!(dropper.accumulator_kbits(), debt);

        dropper.enable(true);
        assert!(dropper.should_drop_frame());
    }

    #[test]
    fn lower_target_scales_existing_debt() {
        let mut dropper = configured(300.0, 30.0);
        dropper.fill(12_500, true); // 100 kbit
        dropper.set_rates(150.0, 30.0);
        assert_relative_eq!(dropper.accumulator_kbits(), 50.0, epsilon = 1e-3);
        assert_relative_eq!(dropper.max_accumulator_kbits(), 150.0);
    }

    #[test]
    fn reset_clears_debt_but_not_enablement() {
        let mut dropper = configured(300.0, 30.0);
        dropper.fill(50_000, true);
        dropper.enable(false);
        dropper.reset();
        assert_eq!(dropper.accumulator_kbits(), 0.0);
        assert!(!dropper.is_enabled());
    }

    #[test]
    fn boxed_dropper_forwards_calls() {
        let mut dropper: Box<dyn FrameDropper + Send> = Box::new(configured(300.0, 30.0));
        dropper.fill(50_000, true);
        assert!(dropper.should_drop_frame());
        dropper.reset();
        assert!(!dropper.should_drop_frame());
    }
}
