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

use serde::{Deserialize, Serialize};

/// Snapshot of the rate controller, suitable for reporting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateControlStats {
    /// Codec bitrate ceiling in bps (0 = uncapped)
    pub max_bitrate_bps: i32,
    /// Bitrate the encoder should currently aim for, in bps
    pub target_bitrate_bps: u32,
    /// Frame rate the codec was configured with
    pub configured_frame_rate_fps: f32,
    /// Last computed incoming frame rate estimate
    pub input_frame_rate_fps: f32,
    /// Drop queries answered since the last reconfiguration
    pub frames_queried: u64,
    /// Drop queries answered with "drop"
    pub frames_dropped: u64,
    /// Encoded frames accounted for
    pub frames_encoded: u64,
    /// Total bytes of the accounted frames
    pub bytes_encoded: u64,
    /// Whether frame dropping is currently enabled
    pub dropping_enabled: bool,
}

impl RateControlStats {
    /// Fraction of drop queries that resulted in a drop, 0.0 when none were made.
    pub fn drop_ratio(&self) -> f64 {
        if self.frames_queried == 0 {
            return 0.0;
        }
        self.frames_dropped as f64 / self.frames_queried as f64
    }
}

/// Per-frame counters maintained by the rate controller
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FrameCounters {
    pub frames_queried: u64,
    pub frames_dropped: u64,
    pub frames_encoded: u64,
    pub bytes_encoded: u64,
}

impl FrameCounters {
    pub fn frame_queried(&mut self, dropped: bool) {
        self.frames_queried += 1;
        if dropped {
            self.frames_dropped += 1;
        }
    }

    pub fn frame_encoded(&mut self, size_bytes: usize) {
        self.frames_encoded += 1;
        self.bytes_encoded += size_bytes as u64;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
