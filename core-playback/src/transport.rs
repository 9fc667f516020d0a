//! # Transport Bridge
//!
//! Connects one player to the OS media controls. Outbound, it mirrors status,
//! metadata and position. Inbound, it turns button presses and seek requests
//! into [`MediaCommand`]s queued on the player's event loop; it never acts on
//! the engine itself.

use crate::error::{PlaybackError, Result};
use crate::instance::InstanceMessage;
use bridge_traits::{
    MediaMetadata, PlayerId, TransportControls, TransportFactory, TransportInput,
    TransportInputSink, TransportStatus,
};
use core_runtime::events::MediaCommand;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

/// Map raw OS input onto a command, given the last published state.
///
/// Relative seeks are clamped at zero. Positions arrive in microseconds and
/// leave in milliseconds.
pub fn resolve_input(
    input: TransportInput,
    status: TransportStatus,
    position_micros: i64,
) -> MediaCommand {
    match input {
        TransportInput::Play => MediaCommand::Play,
        TransportInput::Pause => MediaCommand::Pause,
        TransportInput::PlayPause => {
            if status == TransportStatus::Playing {
                MediaCommand::Pause
            } else {
                MediaCommand::Play
            }
        }
        TransportInput::Next => MediaCommand::Next,
        TransportInput::Previous => MediaCommand::Previous,
        TransportInput::Stop => MediaCommand::Stop,
        TransportInput::Seek { offset_micros } => {
            let target = position_micros.saturating_add(offset_micros).max(0);
            MediaCommand::SeekTo(target as u64 / 1000)
        }
        TransportInput::SetPosition { position_micros } => {
            MediaCommand::SeekTo(position_micros.max(0) as u64 / 1000)
        }
    }
}

#[derive(Default)]
struct MirroredState {
    status: Mutex<TransportStatus>,
    position_micros: AtomicI64,
}

/// Inbound half: receives OS input on the integration's thread.
struct TransportRouter {
    player_id: PlayerId,
    state: Arc<MirroredState>,
    commands: UnboundedSender<InstanceMessage>,
    closed: AtomicBool,
}

impl TransportInputSink for TransportRouter {
    fn deliver(&self, input: TransportInput) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        let status = *self.state.status.lock();
        let position = self.state.position_micros.load(Ordering::Relaxed);
        let command = resolve_input(input, status, position);
        debug!(player_id = %self.player_id, ?input, ?command, "Transport input");

        // The loop is gone once the player is disposed.
        let _ = self.commands.send(InstanceMessage::Media(command));
    }
}

/// A live OS media-controls registration for one player.
pub struct TransportBridge {
    controls: Box<dyn TransportControls>,
    state: Arc<MirroredState>,
    router: Arc<TransportRouter>,
}

impl TransportBridge {
    /// Register with the OS controls through `factory`.
    pub(crate) fn create(
        factory: &dyn TransportFactory,
        player_id: PlayerId,
        commands: UnboundedSender<InstanceMessage>,
    ) -> Result<Self> {
        let state = Arc::new(MirroredState::default());
        let router = Arc::new(TransportRouter {
            player_id,
            state: Arc::clone(&state),
            commands,
            closed: AtomicBool::new(false),
        });

        let sink: Arc<dyn TransportInputSink> = router.clone();
        let controls = factory
            .create(player_id, sink)
            .map_err(|e| PlaybackError::Transport(e.to_string()))?;

        Ok(Self {
            controls,
            state,
            router,
        })
    }

    pub fn publish_metadata(&self, metadata: &MediaMetadata) {
        self.controls.publish_metadata(metadata);
    }

    pub fn publish_status(&self, status: TransportStatus) {
        *self.state.status.lock() = status;
        self.controls.publish_status(status);
    }

    pub fn publish_position(&self, position: Duration) {
        let micros = i64::try_from(position.as_micros()).unwrap_or(i64::MAX);
        self.state.position_micros.store(micros, Ordering::Relaxed);
        trace!(position_us = micros, "Transport position");
        self.controls.publish_position(position);
    }

    pub fn status(&self) -> TransportStatus {
        *self.state.status.lock()
    }

    /// Stop routing input and unregister from the OS.
    pub fn shutdown(&self) {
        if self.router.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.controls.shutdown();
    }
}

impl Drop for TransportBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}
