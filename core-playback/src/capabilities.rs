//! Auxiliary capability types: adaptive bitrate hints and subtitle tracks.
//!
//! Neither is acted on by the desktop engine. ABR settings are validated and
//! kept for inspection; subtitle queries always report no tracks.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};

/// Adaptive bitrate constraints as sent by hosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbrConfig {
    pub max_bitrate_bps: Option<u64>,
    pub min_bitrate_bps: Option<u64>,
    pub preferred_max_width: Option<u32>,
    pub preferred_max_height: Option<u32>,
}

impl AbrConfig {
    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_bitrate_bps, self.max_bitrate_bps) {
            if min > max {
                return Err(PlaybackError::InvalidArgument(format!(
                    "minBitrateBps ({}) exceeds maxBitrateBps ({})",
                    min, max
                )));
            }
        }

        if self.max_bitrate_bps == Some(0) {
            return Err(PlaybackError::InvalidArgument(
                "maxBitrateBps must be greater than 0".to_string(),
            ));
        }

        if self.preferred_max_width == Some(0) || self.preferred_max_height == Some(0) {
            return Err(PlaybackError::InvalidArgument(
                "preferred dimensions must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Subtitle track description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleTrack {
    pub id: String,
    pub language: Option<String>,
    pub label: Option<String>,
}
