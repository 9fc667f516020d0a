//! Decode engine bridge traits.
//!
//! A decode engine wraps exactly one native pipeline (GStreamer, Media
//! Foundation, AVFoundation, ExoPlayer, ...). The core never talks to the
//! native API directly; it drives an engine through [`DecodeEngine`] and
//! receives frames and notifications through [`EngineCallbacks`].
//!
//! ## Threading
//!
//! Engines deliver callbacks from their own worker threads, concurrently with
//! control calls. Implementations of [`EngineCallbacks`] must therefore be
//! cheap and non-blocking: the core copies the frame and enqueues events.
//!
//! ## Contract
//!
//! - [`EngineFactory::open`] builds the pipeline and starts an asynchronous
//!   preroll. Completion is reported with [`EngineEvent::MetadataReady`].
//! - Control calls are requests. A returned `Ok(())` means the backend
//!   accepted the request, not that the transition happened.
//! - Queries are best-effort and return `None` when the value is unknown.
//! - After [`DecodeEngine::dispose`] returns, no callback may be invoked.

use crate::error::Result;
use crate::surface::FrameView;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Playback state as reported by the native backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Paused,
    Playing,
}

/// Backend notification, normalized across native engines.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Preroll finished: duration and native video size are known.
    MetadataReady {
        duration: Option<Duration>,
        width: u32,
        height: u32,
    },
    /// The pipeline reached a new steady state.
    StateChanged(EngineState),
    /// Buffering progress, `0..=100`.
    Buffering { percent: u8 },
    /// End of stream.
    EndOfStream,
    /// Runtime failure with a backend-specific code (`GST_ERROR`, `PLAYBACK_ERROR`, ...).
    Error { code: String, message: String },
}

impl EngineEvent {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Time range the backend currently holds in its buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferedRange {
    pub start: Duration,
    pub end: Duration,
}

impl BufferedRange {
    pub fn new(start: Duration, end: Duration) -> Self {
        Self { start, end }
    }

    /// Returns `true` if the range has no usable upper bound.
    pub fn is_empty(&self) -> bool {
        self.end.is_zero()
    }
}

/// Decoder details surfaced to hosts for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoderInfo {
    pub is_hardware_accelerated: bool,
    pub decoder_name: Option<String>,
    pub codec: Option<String>,
}

/// Receiver for everything a running engine produces.
pub trait EngineCallbacks: Send + Sync {
    /// A decoded RGBA frame. The view is only valid for the duration of the call.
    fn on_frame(&self, frame: FrameView<'_>);

    /// A bus/notification event.
    fn on_event(&self, event: EngineEvent);
}

/// One opened native pipeline.
pub trait DecodeEngine: Send + Sync {
    /// Request playback.
    fn play(&self) -> Result<()>;

    /// Request pause.
    fn pause(&self) -> Result<()>;

    /// Flushing, accurate seek to `position`, applying `rate` in the same request.
    fn seek(&self, position: Duration, rate: f64) -> Result<()>;

    /// Set output volume. The value is already clamped to `0.0..=1.0`.
    fn set_volume(&self, volume: f64) -> Result<()>;

    /// Backends that loop natively can honor this; others rely on the core
    /// restarting playback at end of stream.
    fn set_looping(&self, _looping: bool) -> Result<()> {
        Ok(())
    }

    fn query_position(&self) -> Option<Duration>;

    fn query_duration(&self) -> Option<Duration>;

    fn query_buffered_range(&self) -> Option<BufferedRange>;

    fn decoder_info(&self) -> DecoderInfo {
        DecoderInfo::default()
    }

    /// Stop the pipeline, detach every callback and release native resources.
    ///
    /// Must be idempotent.
    fn dispose(&self);
}

/// Constructs engines for a given backend.
pub trait EngineFactory: Send + Sync {
    /// Name used in logs (`"gstreamer"`, `"media-foundation"`, ...).
    fn backend_name(&self) -> &'static str;

    /// Build a pipeline for `uri` and start prerolling.
    ///
    /// Returns an error synchronously when the pipeline cannot be built.
    fn open(&self, uri: &str, callbacks: Arc<dyn EngineCallbacks>) -> Result<Box<dyn DecodeEngine>>;
}
