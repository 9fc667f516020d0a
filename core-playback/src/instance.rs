//! # Player Instance
//!
//! Owns one decode pipeline and everything hanging off it: the frame sink,
//! the position poller and the optional OS transport bridge. Commands are
//! forwarded to the [`EngineAdapter`]; engine callbacks and OS input are
//! queued as [`InstanceMessage`]s and drained by a single event-loop task,
//! which drives the playback state machine and emits the outward events.
//!
//! ## State machine
//!
//! ```text
//!  Uninitialized ──metadata-ready──> Ready ──playing──> Playing ──paused──> Paused
//!                                                         │   ^──playing──────┘
//!                                                        eos
//!                                                         v
//!                                                     Completed (looping: seek 0 + play)
//!  any ──buffering < 100──> Buffering          any ──dispose──> Disposed
//! ```
//!
//! Only a pause that follows a backend `Playing` report is surfaced, so the
//! preroll pause and pauses caused by seeking while paused stay silent.
//!
//! ## Dispose
//!
//! [`PlayerInstance::dispose`] is idempotent and runs the teardown in a fixed
//! order: close the callback and event gates, cancel the poller, shut the
//! transport down, release the pipeline, revoke the surface registration,
//! release the frame buffer, stop the event loop.

use crate::capabilities::{AbrConfig, SubtitleTrack};
use crate::emitter::EventEmitter;
use crate::engine::EngineAdapter;
use crate::error::{PlaybackError, Result};
use crate::frame_sink::FrameSink;
use crate::poller::PositionPoller;
use crate::transport::TransportBridge;
use bridge_traits::{
    DecoderInfo, EngineCallbacks, EngineEvent, EngineFactory, EngineState, FrameSource,
    FrameSurface, FrameView, MediaMetadata, MemoryPressureLevel, PlayerId, TransportFactory,
    TransportStatus,
};
use core_runtime::config::PlayerSettings;
use core_runtime::events::{EventBus, EventStream, MediaCommand, PlaybackEvent, PlaybackState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Work item for a player's event loop.
#[derive(Debug)]
pub enum InstanceMessage {
    Engine(EngineEvent),
    Media(MediaCommand),
}

/// Collaborators shared by every player created from one configuration.
#[derive(Clone)]
pub struct PlayerContext {
    pub bus: EventBus,
    pub settings: PlayerSettings,
    pub frame_surface: Option<Arc<dyn FrameSurface>>,
    pub transport_factory: Option<Arc<dyn TransportFactory>>,
}

impl PlayerContext {
    pub fn new(bus: EventBus, settings: PlayerSettings) -> Self {
        Self {
            bus,
            settings,
            frame_surface: None,
            transport_factory: None,
        }
    }

    pub fn with_frame_surface(mut self, surface: Arc<dyn FrameSurface>) -> Self {
        self.frame_surface = Some(surface);
        self
    }

    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.transport_factory = Some(factory);
        self
    }
}

// ============================================================================
// Engine callbacks
// ============================================================================

/// Receives frames and bus events on engine threads. Never blocks: frames are
/// copied into the sink, events are queued.
struct InstanceCallbacks {
    player_id: PlayerId,
    sink: FrameSink,
    surface: Option<Arc<dyn FrameSurface>>,
    messages: UnboundedSender<InstanceMessage>,
    closed: AtomicBool,
}

impl InstanceCallbacks {
    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl EngineCallbacks for InstanceCallbacks {
    fn on_frame(&self, frame: FrameView<'_>) {
        if self.is_closed() {
            return;
        }
        // The sink lock is released before the surface is notified.
        if self.sink.write(frame) {
            if let Some(surface) = &self.surface {
                surface.frame_available(self.player_id);
            }
        }
    }

    fn on_event(&self, event: EngineEvent) {
        if self.is_closed() {
            return;
        }
        let _ = self.messages.send(InstanceMessage::Engine(event));
    }
}

// ============================================================================
// Shared state
// ============================================================================

#[derive(Debug, Default)]
struct InstanceStatus {
    state: PlaybackState,
    initialized: bool,
    last_engine_state: Option<EngineState>,
    duration: Option<Duration>,
    metadata: MediaMetadata,
    notification_enabled: bool,
    abr_config: Option<AbrConfig>,
}

fn transport_status_for(state: PlaybackState) -> TransportStatus {
    match state {
        PlaybackState::Playing => TransportStatus::Playing,
        PlaybackState::Ready | PlaybackState::Paused | PlaybackState::Buffering => {
            TransportStatus::Paused
        }
        PlaybackState::Uninitialized | PlaybackState::Completed | PlaybackState::Disposed => {
            TransportStatus::Stopped
        }
    }
}

struct Shared {
    player_id: PlayerId,
    engine: Arc<EngineAdapter>,
    sink: FrameSink,
    callbacks: Arc<InstanceCallbacks>,
    emitter: Arc<EventEmitter>,
    status: Mutex<InstanceStatus>,
    transport: Arc<Mutex<Option<TransportBridge>>>,
    transport_factory: Option<Arc<dyn TransportFactory>>,
    surface: Option<Arc<dyn FrameSurface>>,
    messages: UnboundedSender<InstanceMessage>,
    apply_transport_commands: bool,
    disposed: AtomicBool,
}

impl Shared {
    fn ensure_live(&self) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            Err(PlaybackError::Disposed)
        } else {
            Ok(())
        }
    }

    fn set_state(&self, state: PlaybackState) {
        let previous = {
            let mut status = self.status.lock();
            std::mem::replace(&mut status.state, state)
        };
        debug!(player_id = %self.player_id, from = %previous, to = %state, "State transition");
        self.emitter.emit(PlaybackEvent::state(state));
    }

    fn publish_status(&self, status: TransportStatus) {
        if let Some(bridge) = self.transport.lock().as_ref() {
            bridge.publish_status(status);
        }
    }

    fn handle_engine_event(&self, event: EngineEvent) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }

        match event {
            EngineEvent::MetadataReady {
                duration,
                width,
                height,
            } => self.on_metadata_ready(duration, width, height),
            EngineEvent::StateChanged(state) => self.on_engine_state(state),
            EngineEvent::Buffering { percent } => {
                if percent < 100 {
                    self.set_state(PlaybackState::Buffering);
                }
            }
            EngineEvent::EndOfStream => self.on_end_of_stream(),
            EngineEvent::Error { code, message } => {
                warn!(player_id = %self.player_id, %code, %message, "Engine error");
                self.emitter.emit(PlaybackEvent::Error { code, message });
            }
        }
    }

    fn on_metadata_ready(&self, duration: Option<Duration>, width: u32, height: u32) {
        {
            let mut status = self.status.lock();
            if status.initialized {
                if duration.is_some() {
                    status.duration = duration;
                }
                return;
            }
            status.initialized = true;
            status.duration = duration;
        }

        let duration_ms = duration.map(|d| d.as_millis() as u64).unwrap_or(0);
        info!(
            player_id = %self.player_id,
            duration_ms,
            width,
            height,
            "Player initialized"
        );
        self.emitter.emit(PlaybackEvent::Initialized {
            duration: duration_ms,
            width,
            height,
            id: self.player_id,
        });
        self.set_state(PlaybackState::Ready);
    }

    fn on_engine_state(&self, state: EngineState) {
        self.engine.note_state(state);
        let previous = self.status.lock().last_engine_state.replace(state);

        match state {
            EngineState::Playing => {
                self.set_state(PlaybackState::Playing);
                self.publish_status(TransportStatus::Playing);
            }
            EngineState::Paused => {
                if previous == Some(EngineState::Playing) {
                    self.set_state(PlaybackState::Paused);
                    self.publish_status(TransportStatus::Paused);
                }
            }
        }
    }

    fn on_end_of_stream(&self) {
        self.emitter.emit(PlaybackEvent::Completed);
        self.set_state(PlaybackState::Completed);

        if self.engine.is_looping() {
            debug!(player_id = %self.player_id, "Looping to start");
            if let Err(e) = self.engine.restart() {
                warn!(player_id = %self.player_id, error = %e, "Loop restart failed");
                self.emitter.emit(PlaybackEvent::error(e.code(), e.to_string()));
            }
        } else {
            self.publish_status(TransportStatus::Stopped);
        }
    }

    fn handle_media_command(&self, command: MediaCommand) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }

        self.emitter.emit(PlaybackEvent::media_command(command));

        if !self.apply_transport_commands {
            return;
        }

        let result = match command {
            MediaCommand::Play => self.engine.play(),
            MediaCommand::Pause | MediaCommand::Stop => self.engine.pause(),
            MediaCommand::SeekTo(position_ms) => {
                self.engine.seek(Duration::from_millis(position_ms))
            }
            MediaCommand::Next | MediaCommand::Previous => Ok(()),
        };

        if let Err(e) = result {
            warn!(player_id = %self.player_id, ?command, error = %e, "Transport command failed");
        }
    }

    fn enable_transport(&self) -> Result<()> {
        if self.transport.lock().is_some() {
            return Ok(());
        }

        let Some(factory) = self.transport_factory.as_ref() else {
            debug!(player_id = %self.player_id, "No OS media controls available");
            return Ok(());
        };

        // Registration talks to the OS; the event loop and the poller keep
        // publishing while it runs.
        let bridge = TransportBridge::create(factory.as_ref(), self.player_id, self.messages.clone())?;

        let mut transport = self.transport.lock();
        if transport.is_some() || self.disposed.load(Ordering::Acquire) {
            drop(transport);
            debug!(player_id = %self.player_id, "Discarding redundant OS media controls");
            bridge.shutdown();
            return Ok(());
        }

        let (metadata, state) = {
            let status = self.status.lock();
            (status.metadata.clone(), status.state)
        };
        if !metadata.is_empty() {
            bridge.publish_metadata(&metadata);
        }
        bridge.publish_status(transport_status_for(state));

        info!(player_id = %self.player_id, "OS media controls enabled");
        *transport = Some(bridge);
        Ok(())
    }

    fn disable_transport(&self) {
        if let Some(bridge) = self.transport.lock().take() {
            bridge.shutdown();
            info!(player_id = %self.player_id, "OS media controls disabled");
        }
    }
}

async fn run_event_loop(
    shared: Arc<Shared>,
    mut messages: UnboundedReceiver<InstanceMessage>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            message = messages.recv() => match message {
                Some(InstanceMessage::Engine(event)) => shared.handle_engine_event(event),
                Some(InstanceMessage::Media(command)) => shared.handle_media_command(command),
                None => break,
            },
        }
    }
}

// ============================================================================
// Player Instance
// ============================================================================

/// One playing (or paused, or loading) media source.
///
/// All commands are non-blocking requests to the engine. Their effects are
/// observed through the event stream.
pub struct PlayerInstance {
    shared: Arc<Shared>,
    poller: PositionPoller,
    loop_cancel: CancellationToken,
    bus: EventBus,
    /// Subscribed before the pipeline opened; handed to the first
    /// [`PlayerInstance::events`] caller.
    initial_events: Mutex<Option<EventStream>>,
}

impl PlayerInstance {
    /// Open `uri` on a new pipeline and start prerolling.
    ///
    /// Must be called within a Tokio runtime: the event loop and the poller
    /// are spawned on it.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::Internal`] when no runtime is available or the
    ///   surface refuses the registration
    /// - [`PlaybackError::OpenFailed`] when the backend cannot build a pipeline
    pub fn open(
        player_id: PlayerId,
        uri: &str,
        engine_factory: &dyn EngineFactory,
        context: PlayerContext,
    ) -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| {
            PlaybackError::Internal(format!("player requires a Tokio runtime: {}", e))
        })?;

        // The event loop may publish `initialized` before `open` returns.
        let initial_events = EventStream::for_player(context.bus.subscribe(), player_id);

        let (tx, rx) = mpsc::unbounded_channel();
        let sink = FrameSink::new();

        if let Some(surface) = &context.frame_surface {
            let source: Arc<dyn FrameSource> = Arc::new(sink.clone());
            surface.register(player_id, source).map_err(|e| {
                PlaybackError::Internal(format!("frame surface registration failed: {}", e))
            })?;
        }

        let callbacks = Arc::new(InstanceCallbacks {
            player_id,
            sink: sink.clone(),
            surface: context.frame_surface.clone(),
            messages: tx.clone(),
            closed: AtomicBool::new(false),
        });

        let engine_callbacks: Arc<dyn EngineCallbacks> = callbacks.clone();
        let engine = match engine_factory.open(uri, engine_callbacks) {
            Ok(engine) => engine,
            Err(e) => {
                callbacks.close();
                if let Some(surface) = &context.frame_surface {
                    surface.unregister(player_id);
                }
                return Err(PlaybackError::OpenFailed(e.to_string()));
            }
        };

        let engine = Arc::new(EngineAdapter::new(engine));
        let emitter = Arc::new(EventEmitter::new(player_id, context.bus.clone()));
        let transport = Arc::new(Mutex::new(None));

        let shared = Arc::new(Shared {
            player_id,
            engine: Arc::clone(&engine),
            sink,
            callbacks,
            emitter: Arc::clone(&emitter),
            status: Mutex::new(InstanceStatus::default()),
            transport: Arc::clone(&transport),
            transport_factory: context.transport_factory.clone(),
            surface: context.frame_surface.clone(),
            messages: tx,
            apply_transport_commands: context.settings.apply_transport_commands,
            disposed: AtomicBool::new(false),
        });

        let loop_cancel = CancellationToken::new();
        handle.spawn(run_event_loop(
            Arc::clone(&shared),
            rx,
            loop_cancel.clone(),
        ));

        let poller = PositionPoller::spawn(
            &handle,
            context.settings.position_poll_interval(),
            engine,
            emitter,
            transport,
        );

        info!(
            player_id = %player_id,
            backend = engine_factory.backend_name(),
            uri = %core_runtime::logging::redact_uri(uri),
            "Player created"
        );

        Ok(Self {
            shared,
            poller,
            loop_cancel,
            bus: context.bus,
            initial_events: Mutex::new(Some(initial_events)),
        })
    }

    pub fn id(&self) -> PlayerId {
        self.shared.player_id
    }

    /// This player's events.
    ///
    /// The first call returns a stream subscribed before the pipeline was
    /// opened, so it starts with `initialized` and `ready` however late it is
    /// taken. Later calls only see events emitted after they subscribe.
    pub fn events(&self) -> EventStream {
        self.initial_events.lock().take().unwrap_or_else(|| {
            EventStream::for_player(self.bus.subscribe(), self.shared.player_id)
        })
    }

    pub fn play(&self) -> Result<()> {
        self.shared.ensure_live()?;
        self.shared.engine.play()
    }

    pub fn pause(&self) -> Result<()> {
        self.shared.ensure_live()?;
        self.shared.engine.pause()
    }

    /// Flushing, accurate seek. Negative positions are rejected.
    pub fn seek_to(&self, position_ms: i64) -> Result<()> {
        self.shared.ensure_live()?;
        if position_ms < 0 {
            return Err(PlaybackError::InvalidArgument(format!(
                "seek position must not be negative, got {}",
                position_ms
            )));
        }
        self.shared
            .engine
            .seek(Duration::from_millis(position_ms as u64))
    }

    pub fn set_playback_speed(&self, speed: f64) -> Result<()> {
        self.shared.ensure_live()?;
        self.shared.engine.set_rate(speed)
    }

    pub fn set_looping(&self, looping: bool) -> Result<()> {
        self.shared.ensure_live()?;
        self.shared.engine.set_looping(looping)
    }

    /// Returns the clamped volume that was applied.
    pub fn set_volume(&self, volume: f64) -> Result<f64> {
        self.shared.ensure_live()?;
        self.shared.engine.set_volume(volume)
    }

    /// Store metadata and push it to the OS controls if they are active.
    pub fn set_media_metadata(&self, metadata: MediaMetadata) -> Result<()> {
        self.shared.ensure_live()?;
        self.shared.status.lock().metadata = metadata.clone();
        if let Some(bridge) = self.shared.transport.lock().as_ref() {
            bridge.publish_metadata(&metadata);
        }
        Ok(())
    }

    /// Create or tear down the OS media controls for this player.
    pub fn set_notification_enabled(&self, enabled: bool) -> Result<()> {
        self.shared.ensure_live()?;
        if enabled {
            self.shared.enable_transport()?;
        } else {
            self.shared.disable_transport();
        }
        self.shared.status.lock().notification_enabled = enabled;
        Ok(())
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.status.lock().state
    }

    pub fn duration(&self) -> Option<Duration> {
        self.shared.status.lock().duration
    }

    pub fn metadata(&self) -> MediaMetadata {
        self.shared.status.lock().metadata.clone()
    }

    pub fn notification_enabled(&self) -> bool {
        self.shared.status.lock().notification_enabled
    }

    pub fn volume(&self) -> f64 {
        self.shared.engine.volume()
    }

    pub fn playback_speed(&self) -> f64 {
        self.shared.engine.rate()
    }

    pub fn is_looping(&self) -> bool {
        self.shared.engine.is_looping()
    }

    pub fn transport_status(&self) -> Option<TransportStatus> {
        self.shared.transport.lock().as_ref().map(|b| b.status())
    }

    pub fn frame_source(&self) -> Arc<dyn FrameSource> {
        Arc::new(self.shared.sink.clone())
    }

    pub fn decoder_info(&self) -> Result<DecoderInfo> {
        self.shared.ensure_live()?;
        Ok(self.shared.engine.decoder_info())
    }

    /// Validate and store ABR hints. The desktop engine does not act on them.
    pub fn set_abr_config(&self, config: AbrConfig) -> Result<()> {
        self.shared.ensure_live()?;
        config.validate()?;
        debug!(player_id = %self.shared.player_id, ?config, "ABR config stored");
        self.shared.status.lock().abr_config = Some(config);
        Ok(())
    }

    pub fn abr_config(&self) -> Option<AbrConfig> {
        self.shared.status.lock().abr_config
    }

    pub fn subtitle_tracks(&self) -> Result<Vec<SubtitleTrack>> {
        self.shared.ensure_live()?;
        Ok(Vec::new())
    }

    pub fn select_subtitle_track(&self, track_id: Option<&str>) -> Result<()> {
        self.shared.ensure_live()?;
        debug!(player_id = %self.shared.player_id, ?track_id, "Subtitle selection ignored");
        Ok(())
    }

    /// Picture-in-picture is not supported on any backend.
    pub fn is_pip_available() -> bool {
        false
    }

    pub fn enter_pip(&self) -> Result<()> {
        self.shared.ensure_live()
    }

    pub fn exit_pip(&self) -> Result<()> {
        self.shared.ensure_live()
    }

    pub fn notify_memory_pressure(&self, level: MemoryPressureLevel) {
        if self.is_disposed() {
            return;
        }
        self.shared
            .emitter
            .emit(PlaybackEvent::MemoryPressure { level });
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }

    /// Tear the player down. Safe to call more than once and from any thread.
    pub fn dispose(&self) {
        let shared = &self.shared;
        if shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        shared.callbacks.close();
        shared.emitter.close();
        self.poller.cancel();
        shared.disable_transport();
        shared.engine.dispose();
        if let Some(surface) = &shared.surface {
            surface.unregister(shared.player_id);
        }
        shared.sink.release();
        self.loop_cancel.cancel();
        self.initial_events.lock().take();

        shared.status.lock().state = PlaybackState::Disposed;
        info!(player_id = %shared.player_id, "Player disposed");
    }
}

impl Drop for PlayerInstance {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for PlayerInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerInstance")
            .field("id", &self.shared.player_id)
            .field("state", &self.state())
            .finish()
    }
}
