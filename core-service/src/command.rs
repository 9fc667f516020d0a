//! Typed command dispatch.
//!
//! [`PlayerCommand`] mirrors the host method surface one variant per method,
//! so a host can decode its own wire format straight into it and hand the
//! result to [`PlayerRegistry::execute`].
//!
//! ```ignore
//! let command: PlayerCommand = serde_json::from_str(
//!     r#"{"method": "seekTo", "id": 7, "positionMs": 5000}"#,
//! )?;
//! let response = registry.execute(command)?;
//! ```

use crate::error::Result;
use crate::registry::PlayerRegistry;
use bridge_traits::{DecoderInfo, MediaMetadata, MediaSource, PlayerId};
use core_playback::{AbrConfig, SubtitleTrack};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PlayerCommand {
    Create {
        source: MediaSource,
    },
    Dispose {
        id: PlayerId,
    },
    Play {
        id: PlayerId,
    },
    Pause {
        id: PlayerId,
    },
    SeekTo {
        id: PlayerId,
        position_ms: i64,
    },
    SetPlaybackSpeed {
        id: PlayerId,
        speed: f64,
    },
    SetLooping {
        id: PlayerId,
        looping: bool,
    },
    SetVolume {
        id: PlayerId,
        volume: f64,
    },
    SetMediaMetadata {
        id: PlayerId,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        artist: Option<String>,
        #[serde(default)]
        album: Option<String>,
        #[serde(default)]
        artwork_url: Option<String>,
    },
    SetNotificationEnabled {
        id: PlayerId,
        enabled: bool,
    },
    IsPipAvailable,
    EnterPip {
        id: PlayerId,
    },
    ExitPip {
        id: PlayerId,
    },
    SetAbrConfig {
        id: PlayerId,
        config: AbrConfig,
    },
    GetDecoderInfo {
        id: PlayerId,
    },
    GetSubtitleTracks {
        id: PlayerId,
    },
    SelectSubtitleTrack {
        id: PlayerId,
        #[serde(default)]
        track_id: Option<String>,
    },
    GetVolume {
        id: PlayerId,
    },
}

impl PlayerCommand {
    /// Method name as it appears on the wire.
    pub fn method(&self) -> &'static str {
        match self {
            PlayerCommand::Create { .. } => "create",
            PlayerCommand::Dispose { .. } => "dispose",
            PlayerCommand::Play { .. } => "play",
            PlayerCommand::Pause { .. } => "pause",
            PlayerCommand::SeekTo { .. } => "seekTo",
            PlayerCommand::SetPlaybackSpeed { .. } => "setPlaybackSpeed",
            PlayerCommand::SetLooping { .. } => "setLooping",
            PlayerCommand::SetVolume { .. } => "setVolume",
            PlayerCommand::SetMediaMetadata { .. } => "setMediaMetadata",
            PlayerCommand::SetNotificationEnabled { .. } => "setNotificationEnabled",
            PlayerCommand::IsPipAvailable => "isPipAvailable",
            PlayerCommand::EnterPip { .. } => "enterPip",
            PlayerCommand::ExitPip { .. } => "exitPip",
            PlayerCommand::SetAbrConfig { .. } => "setAbrConfig",
            PlayerCommand::GetDecoderInfo { .. } => "getDecoderInfo",
            PlayerCommand::GetSubtitleTracks { .. } => "getSubtitleTracks",
            PlayerCommand::SelectSubtitleTrack { .. } => "selectSubtitleTrack",
            PlayerCommand::GetVolume { .. } => "getVolume",
        }
    }

    /// Target player, if the command is id-scoped.
    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            PlayerCommand::Create { .. } | PlayerCommand::IsPipAvailable => None,
            PlayerCommand::Dispose { id }
            | PlayerCommand::Play { id }
            | PlayerCommand::Pause { id }
            | PlayerCommand::SeekTo { id, .. }
            | PlayerCommand::SetPlaybackSpeed { id, .. }
            | PlayerCommand::SetLooping { id, .. }
            | PlayerCommand::SetVolume { id, .. }
            | PlayerCommand::SetMediaMetadata { id, .. }
            | PlayerCommand::SetNotificationEnabled { id, .. }
            | PlayerCommand::EnterPip { id }
            | PlayerCommand::ExitPip { id }
            | PlayerCommand::SetAbrConfig { id, .. }
            | PlayerCommand::GetDecoderInfo { id }
            | PlayerCommand::GetSubtitleTracks { id }
            | PlayerCommand::SelectSubtitleTrack { id, .. }
            | PlayerCommand::GetVolume { id } => Some(*id),
        }
    }
}

/// Successful reply to a [`PlayerCommand`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandResponse {
    Created { id: PlayerId },
    Ack,
    Bool(bool),
    DecoderInfo(DecoderInfo),
    SubtitleTracks(Vec<SubtitleTrack>),
    Volume(f64),
}

impl PlayerRegistry {
    /// Run one command against the registry.
    pub fn execute(&self, command: PlayerCommand) -> Result<CommandResponse> {
        tracing::trace!(method = command.method(), player_id = ?command.player_id(), "Executing command");

        let response = match command {
            PlayerCommand::Create { source } => CommandResponse::Created {
                id: self.create(&source)?,
            },
            PlayerCommand::Dispose { id } => {
                self.dispose(id)?;
                CommandResponse::Ack
            }
            PlayerCommand::Play { id } => {
                self.play(id)?;
                CommandResponse::Ack
            }
            PlayerCommand::Pause { id } => {
                self.pause(id)?;
                CommandResponse::Ack
            }
            PlayerCommand::SeekTo { id, position_ms } => {
                self.seek_to(id, position_ms)?;
                CommandResponse::Ack
            }
            PlayerCommand::SetPlaybackSpeed { id, speed } => {
                self.set_playback_speed(id, speed)?;
                CommandResponse::Ack
            }
            PlayerCommand::SetLooping { id, looping } => {
                self.set_looping(id, looping)?;
                CommandResponse::Ack
            }
            PlayerCommand::SetVolume { id, volume } => {
                CommandResponse::Volume(self.set_volume(id, volume)?)
            }
            PlayerCommand::SetMediaMetadata {
                id,
                title,
                artist,
                album,
                artwork_url,
            } => {
                let metadata = MediaMetadata {
                    title,
                    artist,
                    album,
                    artwork_url,
                };
                self.set_media_metadata(id, metadata)?;
                CommandResponse::Ack
            }
            PlayerCommand::SetNotificationEnabled { id, enabled } => {
                self.set_notification_enabled(id, enabled)?;
                CommandResponse::Ack
            }
            PlayerCommand::IsPipAvailable => CommandResponse::Bool(self.is_pip_available()),
            PlayerCommand::EnterPip { id } => {
                self.enter_pip(id)?;
                CommandResponse::Ack
            }
            PlayerCommand::ExitPip { id } => {
                self.exit_pip(id)?;
                CommandResponse::Ack
            }
            PlayerCommand::SetAbrConfig { id, config } => {
                self.set_abr_config(id, config)?;
                CommandResponse::Ack
            }
            PlayerCommand::GetDecoderInfo { id } => {
                CommandResponse::DecoderInfo(self.decoder_info(id)?)
            }
            PlayerCommand::GetSubtitleTracks { id } => {
                CommandResponse::SubtitleTracks(self.subtitle_tracks(id)?)
            }
            PlayerCommand::SelectSubtitleTrack { id, track_id } => {
                self.select_subtitle_track(id, track_id.as_deref())?;
                CommandResponse::Ack
            }
            PlayerCommand::GetVolume { id } => CommandResponse::Volume(self.volume(id)?),
        };

        Ok(response)
    }
}
