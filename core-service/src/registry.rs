//! # Player Registry
//!
//! Arena of live player instances keyed by [`PlayerId`]. This is the command
//! surface hosts talk to: every operation takes an id, looks the instance up
//! and forwards the call. Unknown ids fail with `NO_PLAYER`.
//!
//! ## Id allocation
//!
//! Ids start at 1 and are never reused within a process, so a stale id held
//! by a host after `dispose` can never address a newer player.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = PlayerRegistry::new(&config, EventBus::new(256));
//! let id = registry.create(&MediaSource::network("https://example.com/a.mp4"))?;
//! let mut events = registry.events(id)?;
//! registry.play(id)?;
//! ```

use crate::error::{CoreError, Result};
use bridge_traits::{
    DecoderInfo, EngineFactory, FrameSource, MediaMetadata, MediaSource, MemoryPressureLevel,
    PlayerId, SourceResolver,
};
use core_playback::{AbrConfig, PlayerContext, PlayerInstance, SubtitleTrack};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream, PlaybackState};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct PlayerRegistry {
    players: RwLock<HashMap<PlayerId, Arc<PlayerInstance>>>,
    next_id: AtomicU64,
    engine_factory: Arc<dyn EngineFactory>,
    source_resolver: Arc<dyn SourceResolver>,
    context: PlayerContext,
}

fn validate_source(source: &MediaSource) -> Result<()> {
    let (field, value) = match source {
        MediaSource::Network { url } => ("url", url),
        MediaSource::File { file_path } => ("filePath", file_path),
        MediaSource::Asset { asset_path } => ("assetPath", asset_path),
    };

    if value.trim().is_empty() {
        return Err(CoreError::InvalidSource(format!(
            "{} source requires a non-empty {}",
            source.kind(),
            field
        )));
    }
    Ok(())
}

impl PlayerRegistry {
    pub fn new(config: &CoreConfig, bus: EventBus) -> Self {
        let mut context = PlayerContext::new(bus, config.player.clone());
        if let Some(surface) = &config.frame_surface {
            context = context.with_frame_surface(Arc::clone(surface));
        }
        if let Some(factory) = &config.transport_factory {
            context = context.with_transport_factory(Arc::clone(factory));
        }

        Self {
            players: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            engine_factory: Arc::clone(&config.engine_factory),
            source_resolver: Arc::clone(&config.source_resolver),
            context,
        }
    }

    fn get(&self, id: PlayerId) -> Result<Arc<PlayerInstance>> {
        self.players
            .read()
            .get(&id)
            .cloned()
            .ok_or(CoreError::NoPlayer(id))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Resolve `source`, open a pipeline for it and register the new player.
    ///
    /// No id is consumed when resolution fails; a failed open does consume one.
    pub fn create(&self, source: &MediaSource) -> Result<PlayerId> {
        validate_source(source)?;

        let uri = self
            .source_resolver
            .resolve(source)
            .map_err(|e| CoreError::InvalidSource(e.to_string()))?;

        let id = PlayerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let player = PlayerInstance::open(
            id,
            &uri,
            self.engine_factory.as_ref(),
            self.context.clone(),
        )
        .map_err(|e| {
            warn!(player_id = %id, kind = source.kind(), error = %e, "Player creation failed");
            CoreError::from(e)
        })?;

        self.players.write().insert(id, Arc::new(player));
        debug!(player_id = %id, kind = source.kind(), "Player registered");
        Ok(id)
    }

    /// Remove and tear down a player. Unknown ids are ignored, so repeated
    /// disposal is harmless.
    pub fn dispose(&self, id: PlayerId) -> Result<()> {
        let player = self.players.write().remove(&id);
        match player {
            Some(player) => player.dispose(),
            None => debug!(player_id = %id, "Dispose of unknown player ignored"),
        }
        Ok(())
    }

    /// Dispose every live player.
    pub fn dispose_all(&self) {
        let players: Vec<_> = self.players.write().drain().map(|(_, p)| p).collect();
        if !players.is_empty() {
            info!(count = players.len(), "Disposing all players");
        }
        for player in players {
            player.dispose();
        }
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.read().contains_key(&id)
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<_> = self.players.read().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.players.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.read().is_empty()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub fn play(&self, id: PlayerId) -> Result<()> {
        Ok(self.get(id)?.play()?)
    }

    pub fn pause(&self, id: PlayerId) -> Result<()> {
        Ok(self.get(id)?.pause()?)
    }

    pub fn seek_to(&self, id: PlayerId, position_ms: i64) -> Result<()> {
        Ok(self.get(id)?.seek_to(position_ms)?)
    }

    pub fn set_playback_speed(&self, id: PlayerId, speed: f64) -> Result<()> {
        Ok(self.get(id)?.set_playback_speed(speed)?)
    }

    pub fn set_looping(&self, id: PlayerId, looping: bool) -> Result<()> {
        Ok(self.get(id)?.set_looping(looping)?)
    }

    /// Returns the clamped volume.
    pub fn set_volume(&self, id: PlayerId, volume: f64) -> Result<f64> {
        Ok(self.get(id)?.set_volume(volume)?)
    }

    pub fn set_media_metadata(&self, id: PlayerId, metadata: MediaMetadata) -> Result<()> {
        Ok(self.get(id)?.set_media_metadata(metadata)?)
    }

    pub fn set_notification_enabled(&self, id: PlayerId, enabled: bool) -> Result<()> {
        Ok(self.get(id)?.set_notification_enabled(enabled)?)
    }

    // ========================================================================
    // Auxiliary commands
    // ========================================================================

    pub fn is_pip_available(&self) -> bool {
        PlayerInstance::is_pip_available()
    }

    pub fn enter_pip(&self, id: PlayerId) -> Result<()> {
        Ok(self.get(id)?.enter_pip()?)
    }

    pub fn exit_pip(&self, id: PlayerId) -> Result<()> {
        Ok(self.get(id)?.exit_pip()?)
    }

    pub fn set_abr_config(&self, id: PlayerId, config: AbrConfig) -> Result<()> {
        Ok(self.get(id)?.set_abr_config(config)?)
    }

    pub fn abr_config(&self, id: PlayerId) -> Result<Option<AbrConfig>> {
        Ok(self.get(id)?.abr_config())
    }

    pub fn decoder_info(&self, id: PlayerId) -> Result<DecoderInfo> {
        Ok(self.get(id)?.decoder_info()?)
    }

    pub fn subtitle_tracks(&self, id: PlayerId) -> Result<Vec<SubtitleTrack>> {
        Ok(self.get(id)?.subtitle_tracks()?)
    }

    pub fn select_subtitle_track(&self, id: PlayerId, track_id: Option<&str>) -> Result<()> {
        Ok(self.get(id)?.select_subtitle_track(track_id)?)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn volume(&self, id: PlayerId) -> Result<f64> {
        Ok(self.get(id)?.volume())
    }

    pub fn state(&self, id: PlayerId) -> Result<PlaybackState> {
        Ok(self.get(id)?.state())
    }

    pub fn metadata(&self, id: PlayerId) -> Result<MediaMetadata> {
        Ok(self.get(id)?.metadata())
    }

    /// Pull side of the player's frame slot, for hosts without a registered
    /// frame surface.
    pub fn frame_source(&self, id: PlayerId) -> Result<Arc<dyn FrameSource>> {
        Ok(self.get(id)?.frame_source())
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Stream of events from every player.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.context.bus.subscribe())
    }

    /// Stream of events from one player. The first stream taken for a player
    /// includes its `initialized` and `ready` events even when preroll
    /// finished before this call.
    pub fn events(&self, id: PlayerId) -> Result<EventStream> {
        Ok(self.get(id)?.events())
    }

    /// Broadcast a memory-pressure notification to every live player.
    /// Returns the number of players notified.
    pub fn notify_memory_pressure(&self, level: MemoryPressureLevel) -> usize {
        let players: Vec<_> = self.players.read().values().cloned().collect();
        for player in &players {
            player.notify_memory_pressure(level);
        }
        players.len()
    }
}

impl Drop for PlayerRegistry {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

impl std::fmt::Debug for PlayerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerRegistry")
            .field("players", &self.ids())
            .field("backend", &self.engine_factory.backend_name())
            .finish()
    }
}
