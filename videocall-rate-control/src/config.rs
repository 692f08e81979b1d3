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

use crate::{RateControlError, Result};

/// Number of frame arrival timestamps kept for frame-rate estimation.
///
/// Three seconds of 30fps input, so at common frame rates the max-age
/// window bounds the estimate rather than the history size.
pub const DEFAULT_FRAME_HISTORY_SIZE: usize = 90;

/// Arrivals older than this are ignored when estimating the input frame rate.
pub const DEFAULT_FRAME_HISTORY_MAX_AGE_MS: i64 = 2000;

/// Tunables for the incoming frame-rate estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateControlConfig {
    /// Capacity of the frame arrival history
    pub history_size: usize,
    /// Maximum age of an arrival that still contributes to the estimate
    pub max_age_ms: i64,
}

impl Default for RateControlConfig {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_FRAME_HISTORY_SIZE,
            max_age_ms: DEFAULT_FRAME_HISTORY_MAX_AGE_MS,
        }
    }
}

impl RateControlConfig {
    /// Check that the estimator can produce a rate with these values.
    ///
    /// The newest and the oldest slot never take part in the span scan, so
    /// at least three slots are needed for an estimate to exist at all.
    pub fn validate(&self) -> Result<()> {
        if self.history_size < 3 {
            return Err(RateControlError::InvalidConfig(format!(
                "history_size must be at least 3, got {}",
                self.history_size
            )));
        }
        if self.max_age_ms <= 0 {
            return Err(RateControlError::InvalidConfig(format!(
                "max_age_ms must be positive, got {}",
                self.max_age_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RateControlConfig::default();
        assert_eq!(config.history_size, 90);
        assert_eq!(config.max_age_ms, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tiny_history_is_rejected() {
        let config = RateControlConfig {
            history_size: 2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RateControlError::InvalidConfig(_))
        ));
    }

    #[test]
    fn non_positive_max_age_is_rejected() {
        let config = RateControlConfig {
            max_age_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_deserializes_from_json() {
        let config: RateControlConfig =
            serde_json::from_str(r#"{"history_size": 30, "max_age_ms": 1000}"#).unwrap();
        assert_eq!(config.history_size, 30);
        assert_eq!(config.max_age_ms, 1000);
    }
}
