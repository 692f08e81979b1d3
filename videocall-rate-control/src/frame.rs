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

//! Encoder output as seen by the rate controller.

use serde::{Deserialize, Serialize};

/// The type of a video frame, indicating its dependency on other frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameType {
    /// A KeyFrame (or I-frame) can be decoded independently of any other frame.
    KeyFrame,
    /// A DeltaFrame (or P-frame) can only be decoded if the preceding frame has been decoded.
    DeltaFrame,
}

/// A frame produced by the encoder. Only its size and type matter for
/// budget accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedFrame {
    /// The type of the frame (KeyFrame or DeltaFrame).
    pub frame_type: FrameType,
    /// The encoded bitstream.
    pub data: Vec<u8>,
}

impl EncodedFrame {
    pub fn new(frame_type: FrameType, data: Vec<u8>) -> Self {
        Self { frame_type, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the encoder produced nothing for this cycle.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_keyframe(&self) -> bool {
        self.frame_type == FrameType::KeyFrame
    }

    pub fn is_delta_frame(&self) -> bool {
        self.frame_type == FrameType::DeltaFrame
    }
}
