//! # Desktop Bridge Implementations
//!
//! Default implementations of the playback bridge traits for desktop
//! platforms (primarily Linux).
//!
//! ## Overview
//!
//! - `SourceResolver` via [`DesktopSourceResolver`] (bundled assets live
//!   under `<exe_dir>/data/flutter_assets`)
//! - `MemoryPressureMonitor` via [`ProcMeminfoMonitor`]
//! - `EngineFactory` via `GstEngineFactory` (GStreamer `playbin` with an
//!   RGBA `appsink`)
//! - `TransportFactory` via `MprisTransportFactory` (one MPRIS bus name per
//!   player)
//!
//! ## Feature Flags
//!
//! - `gstreamer`: Enable the GStreamer decode engine
//! - `mpris`: Enable MPRIS media controls over D-Bus
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopSourceResolver, GstEngineFactory};
//!
//! let engines = GstEngineFactory::new()?;
//! let resolver = DesktopSourceResolver::new()?;
//! ```

mod memory;
mod source;

#[cfg(feature = "gstreamer")]
mod gst_engine;

#[cfg(feature = "mpris")]
mod mpris;

pub use memory::{parse_meminfo, ProcMeminfoMonitor};
pub use source::DesktopSourceResolver;

#[cfg(feature = "gstreamer")]
pub use gst_engine::{GstEngine, GstEngineFactory, GST_ERROR_CODE};

#[cfg(feature = "mpris")]
pub use mpris::MprisTransportFactory;
