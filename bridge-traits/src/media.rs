//! Shared media descriptors.
//!
//! Identity, source and metadata types used by every bridge trait and by the
//! core crates. They carry no behavior of their own.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process-unique handle of a player instance.
///
/// The same value identifies the instance's frame source on the display
/// surface, routes its events and names its transport registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(u64);

impl PlayerId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for PlayerId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a player reads its media from.
///
/// Turning a `File` or `Asset` into a URI is the job of a
/// [`SourceResolver`](crate::source::SourceResolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaSource {
    /// Remote stream addressed by URL.
    Network { url: String },
    /// File on the local filesystem.
    File {
        #[serde(rename = "filePath")]
        file_path: String,
    },
    /// Asset bundled with the host application.
    Asset {
        #[serde(rename = "assetPath")]
        asset_path: String,
    },
}

impl MediaSource {
    pub fn network(url: impl Into<String>) -> Self {
        Self::Network { url: url.into() }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::File {
            file_path: path.into(),
        }
    }

    pub fn asset(path: impl Into<String>) -> Self {
        Self::Asset {
            asset_path: path.into(),
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MediaSource::Network { .. } => "network",
            MediaSource::File { .. } => "file",
            MediaSource::Asset { .. } => "asset",
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, MediaSource::Network { .. })
    }
}

/// "Now playing" metadata shown by OS media controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork_url: Option<String>,
}

impl MediaMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_artwork_url(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    /// Returns `true` when no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artist.is_none()
            && self.album.is_none()
            && self.artwork_url.is_none()
    }
}
