//! Source resolution.
//!
//! Converts a [`MediaSource`] into a URI the decode engine understands.
//! Path and asset layouts are host-specific, so this lives behind a trait.

use crate::error::Result;
use crate::media::MediaSource;

#[cfg_attr(test, mockall::automock)]
pub trait SourceResolver: Send + Sync {
    /// Produce a URI for `source`, or
    /// [`BridgeError::InvalidInput`](crate::BridgeError::InvalidInput) when
    /// the source is unusable.
    fn resolve(&self, source: &MediaSource) -> Result<String>;
}
