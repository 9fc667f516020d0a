//! # Core Configuration Module
//!
//! Provides configuration management for the player core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds every bridge implementation the players need plus the
//! tunable [`PlayerSettings`]. It enforces fail-fast validation so a missing
//! decode backend is reported at startup rather than on the first `create`.
//!
//! ## Required Dependencies
//!
//! - `EngineFactory` - Native decode backend (desktop default: GStreamer)
//! - `SourceResolver` - File/asset to URI mapping (desktop default: `DesktopSourceResolver`)
//!
//! ## Optional Dependencies
//!
//! - `FrameSurface` - Compositor that displays frames (audio-only hosts omit it)
//! - `TransportFactory` - OS media controls (desktop default: MPRIS)
//! - `MemoryPressureMonitor` - Low-memory detection (desktop default: `/proc/meminfo`)
//!
//! When the `desktop-shims` feature is enabled, the desktop defaults are
//! injected automatically for anything not provided. The GStreamer engine and
//! the MPRIS transport additionally need the `gstreamer` and `mpris` features.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, PlayerSettings};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .engine_factory(Arc::new(MyEngineFactory))
//!     .frame_surface(Arc::new(MyTextureRegistry))
//!     .player_settings(PlayerSettings::default().with_apply_transport_commands(true))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! Missing capabilities produce [`Error::CapabilityMissing`] with a message
//! naming the feature flag or bridge to provide. Out-of-range settings produce
//! [`Error::InvalidSetting`].

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    EngineFactory, FrameSurface, MemoryPressureMonitor, SourceResolver, TransportFactory,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Player Settings
// ============================================================================

fn default_position_poll_interval_ms() -> u64 {
    200
}

fn default_event_buffer_size() -> usize {
    DEFAULT_EVENT_BUFFER_SIZE
}

fn default_memory_poll_interval_ms() -> Option<u64> {
    Some(5_000)
}

fn default_transport_identity() -> String {
    "AV Player".to_string()
}

/// Tunables shared by every player instance.
///
/// Deserializable so hosts can ship them in their own config files; missing
/// keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSettings {
    /// Period of the position poller.
    #[serde(default = "default_position_poll_interval_ms")]
    pub position_poll_interval_ms: u64,

    /// Capacity of the broadcast channel carrying player events.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,

    /// Apply OS media-control commands to the player in addition to
    /// surfacing them as `mediaCommand` events.
    #[serde(default)]
    pub apply_transport_commands: bool,

    /// Memory pressure sampling period. `None` disables the watcher.
    #[serde(default = "default_memory_poll_interval_ms")]
    pub memory_poll_interval_ms: Option<u64>,

    /// Name shown by the OS media controls.
    #[serde(default = "default_transport_identity")]
    pub transport_identity: String,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            position_poll_interval_ms: default_position_poll_interval_ms(),
            event_buffer_size: default_event_buffer_size(),
            apply_transport_commands: false,
            memory_poll_interval_ms: default_memory_poll_interval_ms(),
            transport_identity: default_transport_identity(),
        }
    }
}

impl PlayerSettings {
    pub fn position_poll_interval(&self) -> Duration {
        Duration::from_millis(self.position_poll_interval_ms)
    }

    pub fn memory_poll_interval(&self) -> Option<Duration> {
        self.memory_poll_interval_ms.map(Duration::from_millis)
    }

    pub fn with_position_poll_interval(mut self, interval: Duration) -> Self {
        self.position_poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    pub fn with_apply_transport_commands(mut self, apply: bool) -> Self {
        self.apply_transport_commands = apply;
        self
    }

    pub fn with_memory_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.memory_poll_interval_ms = interval.map(|i| i.as_millis() as u64);
        self
    }

    pub fn with_transport_identity(mut self, identity: impl Into<String>) -> Self {
        self.transport_identity = identity.into();
        self
    }

    /// Rejects settings that would stall or break the players.
    pub fn validate(&self) -> Result<()> {
        if self.position_poll_interval_ms == 0 {
            return Err(Error::invalid_setting(
                "position_poll_interval_ms",
                "must be greater than 0",
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::invalid_setting(
                "event_buffer_size",
                "must be greater than 0",
            ));
        }

        if self.memory_poll_interval_ms == Some(0) {
            return Err(Error::invalid_setting(
                "memory_poll_interval_ms",
                "must be greater than 0; use None to disable the watcher",
            ));
        }

        if self.transport_identity.trim().is_empty() {
            return Err(Error::invalid_setting(
                "transport_identity",
                "cannot be empty",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Core Config
// ============================================================================

/// Core configuration for the player runtime.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Decode backend used to open every player (required)
    pub engine_factory: Arc<dyn EngineFactory>,

    /// Turns `MediaSource` values into engine URIs (required)
    pub source_resolver: Arc<dyn SourceResolver>,

    /// Compositor that receives frame notifications (optional)
    pub frame_surface: Option<Arc<dyn FrameSurface>>,

    /// OS media controls (optional)
    pub transport_factory: Option<Arc<dyn TransportFactory>>,

    /// Memory pressure sampler (optional)
    pub memory_monitor: Option<Arc<dyn MemoryPressureMonitor>>,

    pub player: PlayerSettings,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("engine_factory", &self.engine_factory.backend_name())
            .field("source_resolver", &"SourceResolver { ... }")
            .field(
                "frame_surface",
                &self.frame_surface.as_ref().map(|_| "FrameSurface { ... }"),
            )
            .field(
                "transport_factory",
                &self
                    .transport_factory
                    .as_ref()
                    .map(|_| "TransportFactory { ... }"),
            )
            .field(
                "memory_monitor",
                &self
                    .memory_monitor
                    .as_ref()
                    .map(|_| "MemoryPressureMonitor { ... }"),
            )
            .field("player", &self.player)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.player.validate()
    }
}

// ============================================================================
// Platform defaults
// ============================================================================

#[cfg(not(feature = "gstreamer"))]
fn engine_factory_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "EngineFactory".to_string(),
        message: "A decode backend is required to open players. \
                 Desktop: enable the 'gstreamer' feature to use the default GStreamer engine. \
                 Mobile: inject the platform player (ExoPlayer/AVPlayer) through an EngineFactory."
            .to_string(),
    }
}

#[cfg(feature = "gstreamer")]
fn provide_default_engine_factory() -> Result<Arc<dyn EngineFactory>> {
    use bridge_desktop::GstEngineFactory;

    let factory = GstEngineFactory::new().map_err(|e| Error::CapabilityMissing {
        capability: "EngineFactory".to_string(),
        message: format!(
            "GStreamer could not be initialized: {}. \
             Install the GStreamer runtime and base/good plugins.",
            e
        ),
    })?;

    let factory: Arc<dyn EngineFactory> = Arc::new(factory);
    Ok(factory)
}

#[cfg(not(feature = "gstreamer"))]
fn provide_default_engine_factory() -> Result<Arc<dyn EngineFactory>> {
    Err(engine_factory_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_source_resolver() -> Result<Arc<dyn SourceResolver>> {
    use bridge_desktop::DesktopSourceResolver;

    let resolver = DesktopSourceResolver::new().map_err(|e| {
        Error::Internal(format!("Failed to locate the executable directory: {}", e))
    })?;

    let resolver: Arc<dyn SourceResolver> = Arc::new(resolver);
    Ok(resolver)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_source_resolver() -> Result<Arc<dyn SourceResolver>> {
    Err(Error::CapabilityMissing {
        capability: "SourceResolver".to_string(),
        message: "A SourceResolver is required to map file and asset sources to URIs. \
                 Desktop: ensure the 'desktop-shims' feature is enabled. \
                 Mobile: inject a resolver that knows the app bundle layout."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_memory_monitor() -> Option<Arc<dyn MemoryPressureMonitor>> {
    use bridge_desktop::ProcMeminfoMonitor;

    let monitor: Arc<dyn MemoryPressureMonitor> = Arc::new(ProcMeminfoMonitor::new());
    Some(monitor)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_memory_monitor() -> Option<Arc<dyn MemoryPressureMonitor>> {
    None
}

#[cfg(feature = "mpris")]
fn provide_default_transport_factory(identity: &str) -> Option<Arc<dyn TransportFactory>> {
    use bridge_desktop::MprisTransportFactory;

    let factory: Arc<dyn TransportFactory> = Arc::new(MprisTransportFactory::new(identity));
    Some(factory)
}

#[cfg(not(feature = "mpris"))]
fn provide_default_transport_factory(_identity: &str) -> Option<Arc<dyn TransportFactory>> {
    None
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to validate the collected
/// bridges and settings.
#[derive(Default)]
pub struct CoreConfigBuilder {
    engine_factory: Option<Arc<dyn EngineFactory>>,
    source_resolver: Option<Arc<dyn SourceResolver>>,
    frame_surface: Option<Arc<dyn FrameSurface>>,
    transport_factory: Option<Arc<dyn TransportFactory>>,
    memory_monitor: Option<Arc<dyn MemoryPressureMonitor>>,
    player: PlayerSettings,
}

impl CoreConfigBuilder {
    /// Sets the decode backend (required).
    ///
    /// If not provided, the GStreamer engine is used when the `gstreamer`
    /// feature is enabled.
    pub fn engine_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    /// Sets the source resolver (required).
    pub fn source_resolver(mut self, resolver: Arc<dyn SourceResolver>) -> Self {
        self.source_resolver = Some(resolver);
        self
    }

    /// Sets the frame surface (optional).
    ///
    /// Without a surface, frames are still written to each player's sink and
    /// can be pulled via `frame_source(id)`.
    pub fn frame_surface(mut self, surface: Arc<dyn FrameSurface>) -> Self {
        self.frame_surface = Some(surface);
        self
    }

    /// Sets the OS media-controls factory (optional).
    pub fn transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.transport_factory = Some(factory);
        self
    }

    /// Sets the memory pressure monitor (optional).
    pub fn memory_monitor(mut self, monitor: Arc<dyn MemoryPressureMonitor>) -> Self {
        self.memory_monitor = Some(monitor);
        self
    }

    /// Replaces the player settings.
    pub fn player_settings(mut self, settings: PlayerSettings) -> Self {
        self.player = settings;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - A required bridge is missing and no desktop default is compiled in
    /// - A player setting is out of range
    pub fn build(self) -> Result<CoreConfig> {
        self.player.validate()?;

        let engine_factory = match self.engine_factory {
            Some(factory) => factory,
            None => provide_default_engine_factory()?,
        };

        let source_resolver = match self.source_resolver {
            Some(resolver) => resolver,
            None => provide_default_source_resolver()?,
        };

        let transport_factory = self
            .transport_factory
            .or_else(|| provide_default_transport_factory(&self.player.transport_identity));

        let memory_monitor = self.memory_monitor.or_else(provide_default_memory_monitor);

        let config = CoreConfig {
            engine_factory,
            source_resolver,
            frame_surface: self.frame_surface,
            transport_factory,
            memory_monitor,
            player: self.player,
        };

        config.validate()?;

        Ok(config)
    }
}
