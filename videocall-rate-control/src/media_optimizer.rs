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

//! Reconciles codec limits, network bitrate and measured input frame rate,
//! and decides per frame whether the encoder should skip it.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::clock::Clock;
use crate::config::RateControlConfig;
use crate::frame::EncodedFrame;
use crate::frame_dropper::{FrameDropper, LeakyBucketDropper};
use crate::frame_rate_estimator::FrameRateEstimator;
use crate::statistics::{FrameCounters, RateControlStats};
use crate::Result;

/// Codec parameters, replaced wholesale whenever the encoder is (re)configured
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodingParameters {
    /// Codec bitrate ceiling in bps. Zero or negative means uncapped.
    pub max_bitrate_bps: i32,
    /// Initial target bitrate in bps
    pub target_bitrate_bps: u32,
    /// Configured frame rate, used until an input frame rate is measured
    pub frame_rate_fps: f32,
}

impl EncodingParameters {
    pub fn new(max_bitrate_bps: i32, target_bitrate_bps: u32, frame_rate_fps: f32) -> Self {
        Self {
            max_bitrate_bps,
            target_bitrate_bps,
            frame_rate_fps,
        }
    }
}

/// Outcome of post-encode accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAccounting {
    /// The frame's bytes were charged to the budget
    Recorded,
    /// The encoder produced nothing; no budget was consumed
    Ignored,
}

struct OptimizerState<D> {
    params: EncodingParameters,
    video_target_bitrate_bps: u32,
    estimator: FrameRateEstimator,
    dropper: D,
    dropping_enabled: bool,
    counters: FrameCounters,
}

impl<D: FrameDropper> OptimizerState<D> {
    /// Everything codec specific starts over.
    fn set_encoding_parameters(&mut self, params: EncodingParameters) {
        let params = EncodingParameters {
            frame_rate_fps: params.frame_rate_fps.max(0.0),
            ..params
        };
        self.params = params;
        self.video_target_bitrate_bps = params.target_bitrate_bps;
        self.estimator.reset();
        self.counters.reset();
        self.dropper.reset();
        self.dropper
            .set_rates(bps_to_kbps(params.target_bitrate_bps), params.frame_rate_fps);
    }

    fn cap_bitrate(&self, bitrate_bps: u32) -> u32 {
        match u32::try_from(self.params.max_bitrate_bps) {
            Ok(max_bps) if max_bps > 0 => bitrate_bps.min(max_bps),
            _ => bitrate_bps,
        }
    }
}

fn bps_to_kbps(bitrate_bps: u32) -> f32 {
    bitrate_bps as f32 / 1000.0
}

/// Adaptive bitrate and frame-drop governor.
///
/// Shared between the encoder thread, which asks [`should_drop_frame`] for
/// every captured frame and reports what it produced through
/// [`record_encoded_frame`], and the bandwidth estimator, which pushes new
/// network rates through [`update_target_rate`]. All state lives behind a
/// single lock; every operation is one short critical section.
///
/// [`should_drop_frame`]: MediaOptimizer::should_drop_frame
/// [`record_encoded_frame`]: MediaOptimizer::record_encoded_frame
/// [`update_target_rate`]: MediaOptimizer::update_target_rate
pub struct MediaOptimizer<D: FrameDropper = LeakyBucketDropper> {
    clock: Arc<dyn Clock>,
    state: Mutex<OptimizerState<D>>,
}

impl<D: FrameDropper> MediaOptimizer<D> {
    /// Create an optimizer with the default estimator settings.
    ///
    /// Until [`configure`](Self::configure) is called it behaves as if
    /// configured with all-zero parameters.
    pub fn new(clock: Arc<dyn Clock>, dropper: D) -> Self {
        Self::build(FrameRateEstimator::default(), clock, dropper)
    }

    /// Create an optimizer with custom estimator settings.
    pub fn with_config(
        config: RateControlConfig,
        clock: Arc<dyn Clock>,
        dropper: D,
    ) -> Result<Self> {
        let estimator = FrameRateEstimator::new(&config)?;
        Ok(Self::build(estimator, clock, dropper))
    }

    fn build(estimator: FrameRateEstimator, clock: Arc<dyn Clock>, dropper: D) -> Self {
        let mut state = OptimizerState {
            params: EncodingParameters::default(),
            video_target_bitrate_bps: 0,
            estimator,
            dropper,
            dropping_enabled: true,
            counters: FrameCounters::default(),
        };
        state.set_encoding_parameters(EncodingParameters::default());
        Self {
            clock,
            state: Mutex::new(state),
        }
    }

    // No critical section can leave the state half updated, so a panic on
    // another thread does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, OptimizerState<D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply new codec parameters.
    ///
    /// Clears the frame arrival history and all admission state. Must be
    /// called whenever the codec changes (resolution, profile, ...).
    pub fn configure(&self, params: EncodingParameters) {
        log::debug!(
            "Configuring rate control: max={}bps target={}bps fps={}",
            params.max_bitrate_bps,
            params.target_bitrate_bps,
            params.frame_rate_fps
        );
        self.lock().set_encoding_parameters(params);
    }

    /// Equivalent to configuring with all-zero parameters.
    pub fn reset(&self) {
        log::debug!("Resetting rate control");
        self.lock().set_encoding_parameters(EncodingParameters::default());
    }

    /// Apply a new network bitrate and return the bitrate actually used,
    /// which is capped to the codec maximum when one is configured.
    pub fn update_target_rate(&self, network_bitrate_bps: u32) -> u32 {
        let mut state = self.lock();
        let target_bps = state.cap_bitrate(network_bitrate_bps);
        if target_bps != network_bitrate_bps {
            log::debug!(
                "Network bitrate {network_bitrate_bps}bps capped to codec maximum {target_bps}bps"
            );
        }
        state.video_target_bitrate_bps = target_bps;

        let mut frame_rate_fps = state.estimator.rate_fps();
        if frame_rate_fps == 0.0 {
            // Nothing measured yet.
            frame_rate_fps = state.params.frame_rate_fps;
        }
        state
            .dropper
            .set_rates(bps_to_kbps(target_bps), frame_rate_fps);

        target_bps
    }

    /// Incoming frame rate, rounded to whole frames per second.
    ///
    /// Re-evaluates the estimate at the current time without recording an
    /// arrival, so it decays to zero once input stalls.
    pub fn current_input_frame_rate(&self) -> u32 {
        let mut state = self.lock();
        let now_ms = self.clock.now_ms();
        state.estimator.estimate(now_ms);
        state.estimator.rounded_rate_fps()
    }

    /// Decide whether the frame being considered should be skipped.
    ///
    /// Counts as an arrival for frame-rate estimation and drains the budget
    /// by one frame interval, so call it exactly once per candidate frame,
    /// right before the encode/skip decision.
    pub fn should_drop_frame(&self) -> bool {
        let mut state = self.lock();
        let now_ms = self.clock.now_ms();
        state.estimator.update(now_ms);
        let input_fps = state.estimator.rounded_rate_fps();
        state.dropper.leak(input_fps);

        let should_drop = state.dropping_enabled && state.dropper.should_drop_frame();
        state.counters.frame_queried(should_drop);
        log::trace!("Drop decision at {now_ms}ms: input_fps={input_fps} drop={should_drop}");
        should_drop
    }

    /// Charge an encoded frame to the byte budget. Empty frames are ignored.
    pub fn record_encoded_frame(&self, frame: &EncodedFrame) -> FrameAccounting {
        let size_bytes = frame.len();
        if size_bytes == 0 {
            return FrameAccounting::Ignored;
        }
        let mut state = self.lock();
        state.dropper.fill(size_bytes, frame.is_delta_frame());
        state.counters.frame_encoded(size_bytes);
        FrameAccounting::Recorded
    }

    /// Turn frame dropping on or off without touching accumulated state.
    pub fn set_frame_dropping_enabled(&self, enabled: bool) {
        let mut state = self.lock();
        state.dropping_enabled = enabled;
        state.dropper.enable(enabled);
    }

    /// The current target bitrate in bps.
    pub fn target_bitrate_bps(&self) -> u32 {
        self.lock().video_target_bitrate_bps
    }

    /// The parameters from the last [`configure`](Self::configure).
    pub fn encoding_parameters(&self) -> EncodingParameters {
        self.lock().params
    }

    pub fn statistics(&self) -> RateControlStats {
        let state = self.lock();
        RateControlStats {
            max_bitrate_bps: state.params.max_bitrate_bps,
            target_bitrate_bps: state.video_target_bitrate_bps,
            configured_frame_rate_fps: state.params.frame_rate_fps,
            input_frame_rate_fps: state.estimator.rate_fps(),
            frames_queried: state.counters.frames_queried,
            frames_dropped: state.counters.frames_dropped,
            frames_encoded: state.counters.frames_encoded,
            bytes_encoded: state.counters.bytes_encoded,
            dropping_enabled: state.dropping_enabled,
        }
    }
}

impl<D: FrameDropper + Default> MediaOptimizer<D> {
    /// Create an optimizer with a default constructed dropper.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, D::default())
    }
}
