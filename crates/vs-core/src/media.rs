//! Video-domain enums and the upload extension table.
//!
//! Enums serialize in lowercase (via `serde(rename_all = "lowercase")`) and
//! implement `Display`/`FromStr` manually so the same strings are used in
//! JSON and in the database.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

// ---------------------------------------------------------------------------
// ConversionStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a video record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Pending,
    Ready,
    Failed,
}

impl ConversionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            other => Err(Error::Internal(format!("unknown conversion status '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// ArtifactLayout
// ---------------------------------------------------------------------------

/// Shape of the playable artifact a transcode produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactLayout {
    /// A single progressive MP4 file, served with byte ranges.
    #[default]
    File,
    /// A directory holding an HLS master playlist, tier playlists and segments.
    Segmented,
}

impl ArtifactLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Segmented => "segmented",
        }
    }
}

impl fmt::Display for ArtifactLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "segmented" => Ok(Self::Segmented),
            other => Err(Error::Internal(format!("unknown artifact layout '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Upload extensions
// ---------------------------------------------------------------------------

/// Extensions accepted by the upload endpoint, lowercase and without the dot.
pub const ALLOWED_UPLOAD_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

/// Whether `ext` (without the dot, any case) may be uploaded.
pub fn is_allowed_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    ALLOWED_UPLOAD_EXTENSIONS.contains(&ext.as_str())
}

/// Extract and validate the extension of a user-supplied filename.
///
/// Returns the lowercase extension. The error message names the offending
/// extension so clients can correct the upload.
pub fn upload_extension(display_name: &str) -> crate::Result<String> {
    let ext = std::path::Path::new(display_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if ext.is_empty() {
        return Err(Error::Validation(format!(
            "file '{display_name}' has no extension; allowed: {}",
            ALLOWED_UPLOAD_EXTENSIONS.join(", ")
        )));
    }
    if !is_allowed_extension(&ext) {
        return Err(Error::Validation(format!(
            "file type .{ext} is not allowed; allowed: {}",
            ALLOWED_UPLOAD_EXTENSIONS.join(", ")
        )));
    }
    Ok(ext)
}
