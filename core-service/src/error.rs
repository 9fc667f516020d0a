use bridge_traits::PlayerId;
use core_playback::PlaybackError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Player {0} not found")]
    NoPlayer(PlayerId),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Failed to open media: {0}")]
    OpenFailed(String),

    #[error("Playback error: {0}")]
    Playback(PlaybackError),

    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

impl CoreError {
    /// Stable code reported to hosts.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NoPlayer(_) => "NO_PLAYER",
            CoreError::InvalidArgs(_) => "INVALID_ARGS",
            CoreError::InvalidSource(_) => "INVALID_SOURCE",
            CoreError::OpenFailed(_) => "OPEN_FAILED",
            CoreError::Playback(e) => e.code(),
            CoreError::InitializationFailed(_) => "INITIALIZATION_FAILED",
            CoreError::CapabilityMissing { .. } => "CAPABILITY_MISSING",
        }
    }

    pub fn is_caller_error(&self) -> bool {
        match self {
            CoreError::NoPlayer(_) | CoreError::InvalidArgs(_) | CoreError::InvalidSource(_) => {
                true
            }
            CoreError::Playback(e) => e.is_caller_error(),
            _ => false,
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            CoreError::Playback(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<PlaybackError> for CoreError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::InvalidArgument(msg) => CoreError::InvalidArgs(msg),
            PlaybackError::InvalidSource(msg) => CoreError::InvalidSource(msg),
            PlaybackError::OpenFailed(msg) => CoreError::OpenFailed(msg),
            other => CoreError::Playback(other),
        }
    }
}

impl From<core_runtime::Error> for CoreError {
    fn from(err: core_runtime::Error) -> Self {
        match err {
            core_runtime::Error::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            other => CoreError::InitializationFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_errors_keep_their_codes() {
        let cases = [
            (PlaybackError::InvalidArgument("speed".into()), "INVALID_ARGS"),
            (PlaybackError::InvalidSource("".into()), "INVALID_SOURCE"),
            (PlaybackError::OpenFailed("no decoder".into()), "OPEN_FAILED"),
            (PlaybackError::Disposed, "NO_PLAYER"),
            (PlaybackError::CommandFailed("seek".into()), "COMMAND_FAILED"),
        ];

        for (err, code) in cases {
            assert_eq!(CoreError::from(err).code(), code);
        }
    }

    #[test]
    fn test_runtime_errors_map_to_initialization() {
        let missing = CoreError::from(core_runtime::Error::CapabilityMissing {
            capability: "EngineFactory".into(),
            message: "enable gstreamer".into(),
        });
        assert_eq!(missing.code(), "CAPABILITY_MISSING");

        let config = CoreError::from(core_runtime::Error::Config("bad".into()));
        assert_eq!(config.code(), "INITIALIZATION_FAILED");
    }

    #[test]
    fn test_classification() {
        assert!(CoreError::NoPlayer(PlayerId::new(3)).is_caller_error());
        assert!(!CoreError::OpenFailed("x".into()).is_caller_error());
        assert!(CoreError::Playback(PlaybackError::Transport("dbus".into())).is_transient());
        assert!(!CoreError::InvalidArgs("x".into()).is_transient());
    }
}
