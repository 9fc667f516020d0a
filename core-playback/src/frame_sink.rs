//! # Frame Sink
//!
//! Single-slot, overwrite-on-write RGBA buffer shared between the engine's
//! frame callback (producer) and the host compositor (consumer).
//!
//! ## Design
//!
//! - **One slot**: every write replaces the previous frame; there is no queue
//! - **One lock**: writers and readers take the same `parking_lot::Mutex`, so a
//!   reader sees either the previous or the newest complete frame
//! - **Stable allocation**: the buffer is reallocated only when the frame
//!   dimensions change
//!
//! ## Usage
//!
//! ```rust
//! use bridge_traits::{FrameSource, FrameView};
//! use core_playback::frame_sink::FrameSink;
//!
//! let sink = FrameSink::new();
//! let pixels = vec![255u8; 2 * 2 * 4];
//! sink.write(FrameView::new(&pixels, 2, 2));
//!
//! let frame = sink.copy_frame().unwrap();
//! assert_eq!((frame.width, frame.height), (2, 2));
//! ```

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{BridgeError, FrameSource, FrameView, BYTES_PER_PIXEL};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct FrameSlot {
    buffer: Vec<u8>,
    width: u32,
    height: u32,
    has_frame: bool,
}

/// Shared handle to a player's frame slot. Cloning is cheap.
#[derive(Clone, Default)]
pub struct FrameSink {
    slot: Arc<Mutex<FrameSlot>>,
}

impl FrameSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `frame` into the slot.
    ///
    /// Copies `min(frame.pixels.len(), capacity)` bytes; a short frame leaves
    /// the tail of the previous one in place. Returns `false` for frames with
    /// a zero dimension, which are dropped.
    pub fn write(&self, frame: FrameView<'_>) -> bool {
        if frame.width == 0 || frame.height == 0 {
            return false;
        }

        let mut slot = self.slot.lock();
        if slot.width != frame.width || slot.height != frame.height {
            slot.buffer = vec![0; frame.expected_len()];
            slot.width = frame.width;
            slot.height = frame.height;
        }

        let len = frame.pixels.len().min(slot.buffer.len());
        slot.buffer[..len].copy_from_slice(&frame.pixels[..len]);
        slot.has_frame = true;
        true
    }

    /// Current frame dimensions; `(0, 0)` before the first frame.
    pub fn dimensions(&self) -> (u32, u32) {
        let slot = self.slot.lock();
        (slot.width, slot.height)
    }

    pub fn has_frame(&self) -> bool {
        self.slot.lock().has_frame
    }

    /// Size of the backing allocation in bytes.
    pub fn capacity(&self) -> usize {
        self.slot.lock().buffer.len()
    }

    /// Drop the pixel buffer. Later reads fail until a new frame is written.
    pub fn release(&self) {
        let mut slot = self.slot.lock();
        *slot = FrameSlot::default();
    }
}

impl FrameSource for FrameSink {
    fn read_frame(&self, reader: &mut dyn FnMut(FrameView<'_>)) -> BridgeResult<()> {
        let slot = self.slot.lock();
        if !slot.has_frame {
            return Err(BridgeError::NotAvailable(
                "no frame has been decoded yet".to_string(),
            ));
        }

        reader(FrameView::new(&slot.buffer, slot.width, slot.height));
        Ok(())
    }
}

impl std::fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("FrameSink")
            .field("width", &slot.width)
            .field("height", &slot.height)
            .field("bytes_per_pixel", &BYTES_PER_PIXEL)
            .field("has_frame", &slot.has_frame)
            .finish()
    }
}
