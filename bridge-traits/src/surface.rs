//! Display surface bridge traits.
//!
//! Hosts render decoded video through a compositor (a Flutter texture
//! registrar, a GPU swapchain, an image widget). The core exposes each
//! player's latest frame as a [`FrameSource`] registered on a
//! [`FrameSurface`], and pings the surface whenever a new frame lands.

use crate::error::Result;
use crate::media::PlayerId;
use std::sync::Arc;

/// Bytes per pixel of the single supported pixel format (RGBA).
pub const BYTES_PER_PIXEL: usize = 4;

/// Borrowed view of one RGBA frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
}

impl<'a> FrameView<'a> {
    pub fn new(pixels: &'a [u8], width: u32, height: u32) -> Self {
        Self {
            pixels,
            width,
            height,
        }
    }

    /// Byte length a tightly packed frame of these dimensions occupies.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

/// Owned copy of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Pull side of a frame hand-off.
pub trait FrameSource: Send + Sync {
    /// Run `reader` against the current frame while it is locked.
    ///
    /// Fails with [`BridgeError::NotAvailable`](crate::BridgeError::NotAvailable)
    /// when no frame has arrived yet.
    fn read_frame(&self, reader: &mut dyn FnMut(FrameView<'_>)) -> Result<()>;

    /// Copy the current frame out.
    fn copy_frame(&self) -> Result<VideoFrame> {
        let mut copy = None;
        self.read_frame(&mut |view| {
            copy = Some(VideoFrame {
                pixels: view.pixels.to_vec(),
                width: view.width,
                height: view.height,
            });
        })?;
        copy.ok_or_else(|| crate::BridgeError::NotAvailable("frame".to_string()))
    }
}

/// Host compositor that displays player frames.
pub trait FrameSurface: Send + Sync {
    /// Expose `source` under `id`.
    fn register(&self, id: PlayerId, source: Arc<dyn FrameSource>) -> Result<()>;

    /// A new frame is available for `id`. Called outside the frame lock.
    fn frame_available(&self, id: PlayerId);

    /// Revoke the registration. Unknown ids are ignored.
    fn unregister(&self, id: PlayerId);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSource(Vec<u8>);

    impl FrameSource for StaticSource {
        fn read_frame(&self, reader: &mut dyn FnMut(FrameView<'_>)) -> Result<()> {
            reader(FrameView::new(&self.0, 1, 1));
            Ok(())
        }
    }

    #[test]
    fn test_expected_len() {
        let data = [0u8; 32];
        let view = FrameView::new(&data, 4, 2);
        assert_eq!(view.expected_len(), 32);
    }

    #[test]
    fn test_copy_frame_default() {
        let source = StaticSource(vec![1, 2, 3, 4]);
        let frame = source.copy_frame().unwrap();
        assert_eq!(frame.pixels, vec![1, 2, 3, 4]);
        assert_eq!((frame.width, frame.height), (1, 1));
    }
}
