//! # Player Instance Core
//!
//! Per-instance playback: one decode pipeline, one frame slot, one event
//! stream, and an optional link to the OS media controls.
//!
//! ## Overview
//!
//! This crate handles:
//! - The playback state machine and event protocol ([`instance`])
//! - Rate, volume and seek normalization over native backends ([`engine`])
//! - Tear-free frame hand-off to the host compositor ([`frame_sink`])
//! - Periodic position/buffering reports ([`poller`])
//! - OS media-control integration ([`transport`])
//!
//! Native backends plug in through [`bridge_traits::EngineFactory`]; events
//! are published on a [`core_runtime::events::EventBus`].

pub mod capabilities;
mod emitter;
pub mod engine;
pub mod error;
pub mod frame_sink;
pub mod instance;
pub mod poller;
pub mod transport;

pub use capabilities::{AbrConfig, SubtitleTrack};
pub use engine::EngineAdapter;
pub use error::{PlaybackError, Result};
pub use frame_sink::FrameSink;
pub use instance::{PlayerContext, PlayerInstance};
