//! OS media transport bridge traits.
//!
//! Covers "now playing" integrations such as MPRIS on Linux and the System
//! Media Transport Controls on Windows. Outbound calls publish state and are
//! best-effort; inbound button presses arrive as [`TransportInput`] values on
//! a [`TransportInputSink`].

use crate::error::Result;
use crate::media::{MediaMetadata, PlayerId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Playback status mirrored to the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TransportStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl TransportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportStatus::Playing => "Playing",
            TransportStatus::Paused => "Paused",
            TransportStatus::Stopped => "Stopped",
        }
    }
}

/// Raw control input as delivered by the OS surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportInput {
    Play,
    Pause,
    /// Toggle, resolved against the last published status.
    PlayPause,
    Next,
    Previous,
    Stop,
    /// Relative seek in microseconds (may be negative).
    Seek { offset_micros: i64 },
    /// Absolute position in microseconds.
    SetPosition { position_micros: i64 },
}

/// Receives inbound OS control input. Called from the OS integration's own thread.
pub trait TransportInputSink: Send + Sync {
    fn deliver(&self, input: TransportInput);
}

/// A live registration with the OS media controls.
///
/// Publishing never blocks and never fails loudly: implementations log and
/// drop updates they cannot apply.
pub trait TransportControls: Send + Sync {
    fn publish_metadata(&self, metadata: &MediaMetadata);

    fn publish_status(&self, status: TransportStatus);

    fn publish_position(&self, position: Duration);

    /// Unregister from the OS. Must be idempotent.
    fn shutdown(&self);
}

/// Creates OS media control registrations.
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        player_id: PlayerId,
        inputs: Arc<dyn TransportInputSink>,
    ) -> Result<Box<dyn TransportControls>>;
}
