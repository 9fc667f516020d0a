//! Source resolution for desktop hosts.

use bridge_traits::{
    error::{BridgeError, Result},
    MediaSource, SourceResolver,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory, relative to the executable, where bundled assets live.
const ASSET_DIR: &str = "data/flutter_assets";

/// Maps media sources onto URIs GStreamer can open.
///
/// - `network` URLs pass through unchanged
/// - `file` paths become `file://<path>`
/// - `asset` paths are resolved against the bundle's asset directory
#[derive(Debug, Clone)]
pub struct DesktopSourceResolver {
    asset_root: PathBuf,
}

impl DesktopSourceResolver {
    /// Resolver rooted at `<exe_dir>/data/flutter_assets`.
    pub fn new() -> Result<Self> {
        let exe = std::env::current_exe().map_err(BridgeError::Io)?;
        let exe = exe.canonicalize().unwrap_or(exe);
        let exe_dir = exe.parent().ok_or_else(|| {
            BridgeError::NotAvailable(format!(
                "executable path has no parent directory: {}",
                exe.display()
            ))
        })?;

        let asset_root = exe_dir.join(ASSET_DIR);
        debug!(asset_root = %asset_root.display(), "Desktop source resolver initialized");
        Ok(Self { asset_root })
    }

    /// Resolver with an explicit asset directory.
    pub fn with_asset_root(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
        }
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }
}

fn require_non_empty<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BridgeError::InvalidInput(format!("{} cannot be empty", field)));
    }
    Ok(trimmed)
}

fn has_scheme(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && !rest.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

impl SourceResolver for DesktopSourceResolver {
    fn resolve(&self, source: &MediaSource) -> Result<String> {
        match source {
            MediaSource::Network { url } => {
                let url = require_non_empty(url, "url")?;
                if !has_scheme(url) {
                    return Err(BridgeError::InvalidInput(format!(
                        "network source is not a URL: {}",
                        url
                    )));
                }
                Ok(url.to_string())
            }
            MediaSource::File { file_path } => {
                let path = require_non_empty(file_path, "filePath")?;
                if path.starts_with("file://") {
                    Ok(path.to_string())
                } else {
                    Ok(format!("file://{}", path))
                }
            }
            MediaSource::Asset { asset_path } => {
                let asset = require_non_empty(asset_path, "assetPath")?;
                let asset = asset.trim_start_matches('/');
                Ok(format!(
                    "file://{}",
                    self.asset_root.join(asset).display()
                ))
            }
        }
    }
}
