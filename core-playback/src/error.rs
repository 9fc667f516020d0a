//! # Playback Error Types
//!
//! Errors returned synchronously by player commands. Failures after a player
//! is open travel as `error` events instead.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Caller Errors
    // ========================================================================
    /// A command argument is out of range or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The media source could not be turned into a URI.
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The backend failed to build a pipeline for the source.
    #[error("Failed to open media: {0}")]
    OpenFailed(String),

    /// The backend rejected a request on an open pipeline.
    #[error("Engine command failed: {0}")]
    CommandFailed(String),

    /// The player was disposed while the command was in flight.
    #[error("Player disposed")]
    Disposed,

    // ========================================================================
    // Integration Errors
    // ========================================================================
    /// OS media controls could not be created.
    #[error("Transport controls error: {0}")]
    Transport(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Stable code reported to hosts.
    pub fn code(&self) -> &'static str {
        match self {
            PlaybackError::InvalidArgument(_) => "INVALID_ARGS",
            PlaybackError::InvalidSource(_) => "INVALID_SOURCE",
            PlaybackError::OpenFailed(_) => "OPEN_FAILED",
            PlaybackError::Disposed => "NO_PLAYER",
            PlaybackError::CommandFailed(_) => "COMMAND_FAILED",
            PlaybackError::Transport(_) => "TRANSPORT_ERROR",
            PlaybackError::Internal(_) => "INTERNAL",
        }
    }

    /// Returns `true` if the caller sent something unusable.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidArgument(_) | PlaybackError::InvalidSource(_)
        )
    }

    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::CommandFailed(_) | PlaybackError::Transport(_)
        )
    }

    pub(crate) fn command(err: BridgeError) -> Self {
        PlaybackError::CommandFailed(err.to_string())
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
