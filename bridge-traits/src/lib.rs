//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host platform implements for the
//! player core.
//!
//! ## Overview
//!
//! This crate defines the contract between the core player and the native
//! world. Each trait is a capability the core needs but cannot provide in a
//! portable way: a decode pipeline, a compositor to show frames on, the OS
//! media controls, a way to turn asset paths into URIs.
//!
//! ## Traits
//!
//! ### Media pipeline
//! - [`EngineFactory`](engine::EngineFactory) / [`DecodeEngine`](engine::DecodeEngine) - Native decode backends
//! - [`EngineCallbacks`](engine::EngineCallbacks) - Frame and bus notifications from a backend
//!
//! ### Presentation
//! - [`FrameSurface`](surface::FrameSurface) - Host compositor that displays frames
//! - [`FrameSource`](surface::FrameSource) - Pull side of a player's frame slot
//! - [`TransportFactory`](transport::TransportFactory) - OS "now playing" controls (MPRIS, SMTC)
//!
//! ### Platform integration
//! - [`SourceResolver`](source::SourceResolver) - File/asset to URI resolution
//! - [`MemoryPressureMonitor`](system::MemoryPressureMonitor) - Low-memory detection
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Engine | Transport |
//! |----------|---------------------|--------|-----------|
//! | Linux    | `bridge-desktop`    | GStreamer | MPRIS |
//! | Windows  | TBD                 | Media Foundation | SMTC |
//! | macOS    | TBD                 | AVFoundation | MPNowPlayingInfoCenter |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability
//! is missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! let engine_factory = config.engine_factory
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "EngineFactory".to_string(),
//!         message: "No decode backend provided. \
//!                   Desktop: enable the 'gstreamer' feature. \
//!                   Mobile: inject the platform player.".to_string()
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert native errors into it with an actionable message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`. Engines and OS integrations call
//! back from their own threads.

pub mod engine;
pub mod error;
pub mod log;
pub mod media;
pub mod source;
pub mod surface;
pub mod system;
pub mod transport;

pub use error::BridgeError;

// Re-export commonly used types
pub use engine::{
    BufferedRange, DecodeEngine, DecoderInfo, EngineCallbacks, EngineEvent, EngineFactory,
    EngineState,
};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{MediaMetadata, MediaSource, PlayerId};
pub use source::SourceResolver;
pub use surface::{FrameSource, FrameSurface, FrameView, VideoFrame, BYTES_PER_PIXEL};
pub use system::{MemoryPressureLevel, MemoryPressureMonitor};
pub use transport::{
    TransportControls, TransportFactory, TransportInput, TransportInputSink, TransportStatus,
};
