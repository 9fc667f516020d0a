//! MPRIS media controls.
//!
//! One `org.mpris.MediaPlayer2.av_player.instance<id>` bus name per player.
//! `mpris_server::Player` is not `Send`, so every registration runs on its
//! own thread with a current-thread Tokio runtime and a `LocalSet`; the
//! [`TransportControls`] handle talks to it over a channel.
//!
//! Registration on the session bus happens on that thread, so
//! [`TransportFactory::create`] returns immediately. Updates sent before the
//! name is owned are queued; a failed registration is logged and the
//! handle's updates are dropped.

use bridge_traits::{
    error::{BridgeError, Result},
    MediaMetadata, PlayerId, TransportControls, TransportFactory, TransportInput,
    TransportInputSink, TransportStatus,
};
use mpris_server::{Metadata, PlaybackStatus, Player, Time, TrackId};
use std::rc::Rc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

const BUS_NAME_PREFIX: &str = "av_player.instance";
const TRACK_ID: &str = "/org/mpris/MediaPlayer2/Track/0";

/// Creates one MPRIS server per player.
#[derive(Debug, Clone)]
pub struct MprisTransportFactory {
    identity: String,
}

impl MprisTransportFactory {
    /// `identity` is the player name shown by desktop shells.
    pub fn new(identity: &str) -> Self {
        Self {
            identity: identity.to_string(),
        }
    }
}

#[derive(Debug)]
enum Update {
    Metadata(MediaMetadata),
    Status(TransportStatus),
    Position(Duration),
    Shutdown,
}

fn playback_status(status: TransportStatus) -> PlaybackStatus {
    match status {
        TransportStatus::Playing => PlaybackStatus::Playing,
        TransportStatus::Paused => PlaybackStatus::Paused,
        TransportStatus::Stopped => PlaybackStatus::Stopped,
    }
}

fn build_metadata(metadata: &MediaMetadata) -> Metadata {
    let mut builder = Metadata::builder();
    if let Ok(track_id) = TrackId::try_from(TRACK_ID) {
        builder = builder.trackid(track_id);
    }
    if let Some(title) = &metadata.title {
        builder = builder.title(title.clone());
    }
    if let Some(artist) = &metadata.artist {
        builder = builder.artist([artist.clone()]);
    }
    if let Some(album) = &metadata.album {
        builder = builder.album(album.clone());
    }
    if let Some(art_url) = &metadata.artwork_url {
        builder = builder.art_url(art_url.clone());
    }
    builder.build()
}

fn connect_inputs(player: &Player, inputs: &Arc<dyn TransportInputSink>) {
    let sink = Arc::clone(inputs);
    player.connect_play(move |_| sink.deliver(TransportInput::Play));
    let sink = Arc::clone(inputs);
    player.connect_pause(move |_| sink.deliver(TransportInput::Pause));
    let sink = Arc::clone(inputs);
    player.connect_play_pause(move |_| sink.deliver(TransportInput::PlayPause));
    let sink = Arc::clone(inputs);
    player.connect_stop(move |_| sink.deliver(TransportInput::Stop));
    let sink = Arc::clone(inputs);
    player.connect_next(move |_| sink.deliver(TransportInput::Next));
    let sink = Arc::clone(inputs);
    player.connect_previous(move |_| sink.deliver(TransportInput::Previous));
    let sink = Arc::clone(inputs);
    player.connect_seek(move |_, offset| {
        sink.deliver(TransportInput::Seek {
            offset_micros: offset.as_micros(),
        })
    });
    let sink = Arc::clone(inputs);
    player.connect_set_position(move |_, _track_id, position| {
        sink.deliver(TransportInput::SetPosition {
            position_micros: position.as_micros(),
        })
    });
}

async fn serve(
    bus_suffix: String,
    identity: String,
    inputs: Arc<dyn TransportInputSink>,
    mut updates: UnboundedReceiver<Update>,
) {
    let player = Player::builder(&bus_suffix)
        .identity(identity)
        .can_play(true)
        .can_pause(true)
        .can_go_next(true)
        .can_go_previous(true)
        .can_seek(true)
        .can_control(true)
        .build()
        .await;

    let player = match player {
        Ok(player) => Rc::new(player),
        Err(e) => {
            warn!(bus = %bus_suffix, error = %e, "MPRIS registration failed; is a session bus running?");
            return;
        }
    };

    connect_inputs(&player, &inputs);
    tokio::task::spawn_local(player.run());
    info!(bus = %bus_suffix, "MPRIS server registered");

    while let Some(update) = updates.recv().await {
        let result = match update {
            Update::Metadata(metadata) => player.set_metadata(build_metadata(&metadata)).await,
            Update::Status(status) => player.set_playback_status(playback_status(status)).await,
            Update::Position(position) => {
                player.set_position(Time::from_micros(position.as_micros() as i64));
                Ok(())
            }
            Update::Shutdown => break,
        };
        if let Err(e) = result {
            warn!(bus = %bus_suffix, error = %e, "MPRIS update failed");
        }
    }

    debug!(bus = %bus_suffix, "MPRIS server stopped");
}

fn run_server(
    bus_suffix: String,
    identity: String,
    inputs: Arc<dyn TransportInputSink>,
    updates: UnboundedReceiver<Update>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!(bus = %bus_suffix, error = %e, "MPRIS runtime could not start");
            return;
        }
    };

    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, serve(bus_suffix, identity, inputs, updates));
}

impl TransportFactory for MprisTransportFactory {
    fn create(
        &self,
        player_id: PlayerId,
        inputs: Arc<dyn TransportInputSink>,
    ) -> Result<Box<dyn TransportControls>> {
        let bus_suffix = format!("{}{}", BUS_NAME_PREFIX, player_id);
        let (tx, rx) = mpsc::unbounded_channel();

        let identity = self.identity.clone();
        thread::Builder::new()
            .name(format!("mpris-{}", player_id))
            .spawn(move || run_server(bus_suffix, identity, inputs, rx))
            .map_err(BridgeError::Io)?;

        Ok(Box::new(MprisControls { updates: tx }))
    }
}

struct MprisControls {
    updates: UnboundedSender<Update>,
}

impl MprisControls {
    fn send(&self, update: Update) {
        // The server thread is gone after shutdown; late updates are dropped.
        let _ = self.updates.send(update);
    }
}

impl TransportControls for MprisControls {
    fn publish_metadata(&self, metadata: &MediaMetadata) {
        self.send(Update::Metadata(metadata.clone()));
    }

    fn publish_status(&self, status: TransportStatus) {
        self.send(Update::Status(status));
    }

    fn publish_position(&self, position: Duration) {
        self.send(Update::Position(position));
    }

    fn shutdown(&self) {
        self.send(Update::Shutdown);
    }
}

impl Drop for MprisControls {
    fn drop(&mut self) {
        self.send(Update::Shutdown);
    }
}
