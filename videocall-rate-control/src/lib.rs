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

//! Adaptive bitrate and frame-rate governor for real-time video encoders.
//!
//! [`MediaOptimizer`] sits between a bandwidth estimator and a video encoder.
//! It caps network bitrate updates to the codec's configured maximum, keeps
//! an estimate of the incoming frame rate, and tells the encoder, frame by
//! frame, whether to encode or skip so output stays within the byte budget
//! tracked by a [`FrameDropper`].
//!
//! ```
//! use std::sync::Arc;
//! use videocall_rate_control::{
//!     EncodedFrame, EncodingParameters, FrameType, MediaOptimizer, SimulatedClock,
//! };
//!
//! let clock = Arc::new(SimulatedClock::new(0));
//! let optimizer: MediaOptimizer = MediaOptimizer::with_clock(clock.clone());
//! optimizer.configure(EncodingParameters::new(500_000, 300_000, 30.0));
//!
//! assert_eq!(optimizer.update_target_rate(800_000), 500_000);
//!
//! clock.advance_ms(33);
//! if !optimizer.should_drop_frame() {
//!     let frame = EncodedFrame::new(FrameType::KeyFrame, vec![0; 2_000]);
//!     optimizer.record_encoded_frame(&frame);
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod frame_dropper;
pub mod frame_rate_estimator;
pub mod media_optimizer;
pub mod statistics;

pub use clock::{Clock, SimulatedClock, SystemClock};
pub use config::RateControlConfig;
pub use error::{RateControlError, Result};
pub use frame::{EncodedFrame, FrameType};
pub use frame_dropper::{FrameDropper, LeakyBucketConfig, LeakyBucketDropper};
pub use frame_rate_estimator::FrameRateEstimator;
pub use media_optimizer::{EncodingParameters, FrameAccounting, MediaOptimizer};
pub use statistics::RateControlStats;
