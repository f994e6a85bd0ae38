//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, storage, streaming, tools and transcoding.
//! Every section defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::{ArtifactLayout, Error};

const MIB: u64 = 1024 * 1024;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub streaming: StreamingConfig,
    pub tools: ToolsConfig,
    pub transcode: TranscodeConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }
        if self.server.request_timeout_secs == 0 {
            warnings.push("server.request_timeout_secs is 0; requests will time out immediately".into());
        }

        let s = &self.streaming;
        if s.default_window_bytes == 0 {
            warnings.push("streaming.default_window_bytes is 0".into());
        }
        if s.open_end_cap_bytes == 0 {
            warnings.push("streaming.open_end_cap_bytes is 0".into());
        }
        if s.default_window_bytes > s.max_slice_bytes || s.open_end_cap_bytes > s.max_slice_bytes {
            warnings.push(format!(
                "streaming windows exceed max_slice_bytes ({}); responses will be trimmed",
                s.max_slice_bytes
            ));
        }

        let t = &self.transcode;
        if t.timeout_secs == 0 {
            warnings.push("transcode.timeout_secs is 0; every job will time out".into());
        }
        if t.layout == ArtifactLayout::Segmented && t.tiers.is_empty() {
            warnings.push("transcode.layout is segmented but no tiers are configured".into());
        }
        for (i, tier) in t.tiers.iter().enumerate() {
            if tier.name.is_empty() || tier.name.contains(['/', '\\', '.']) {
                warnings.push(format!("transcode.tiers[{i}].name '{}' is not a plain name", tier.name));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    /// Per-request handler timeout. Never applies to background transcodes.
    pub request_timeout_secs: u64,
    pub max_upload_bytes: u64,
    /// How long shutdown waits for in-flight transcode jobs.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            db_path: PathBuf::from("./data/vidstream.db"),
            request_timeout_secs: 30,
            max_upload_bytes: 2048 * MIB,
            shutdown_grace_secs: 30,
        }
    }
}

/// Where uploads and artifacts live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
}

impl StorageConfig {
    /// Staging area for raw uploads awaiting transcode.
    pub fn incoming_dir(&self) -> PathBuf {
        self.upload_dir.join(".incoming")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./data/uploads"),
        }
    }
}

/// Byte-range streaming limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Window served when the request carries no `Range` header.
    pub default_window_bytes: u64,
    /// Window served for `bytes=N-` (start given, end omitted).
    pub open_end_cap_bytes: u64,
    /// Hard ceiling on bytes read into memory for one response.
    pub max_slice_bytes: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            default_window_bytes: MIB,
            open_end_cap_bytes: 5 * MIB,
            max_slice_bytes: 100 * MIB,
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
}

/// One rung of the segmented (adaptive) output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTier {
    /// Base name for the tier playlist and segments, e.g. `480p`.
    pub name: String,
    /// `WIDTHxHEIGHT`, passed to the scale filter and the master playlist.
    pub resolution: String,
    /// ffmpeg bitrate string, e.g. `1M`.
    pub video_bitrate: String,
    /// ffmpeg bitrate string, e.g. `96k`.
    pub audio_bitrate: String,
}

/// Transcoding settings. The argument set is fixed per version; only the
/// values below are tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    pub layout: ArtifactLayout,
    pub video_crf: u32,
    pub video_preset: String,
    pub audio_bitrate: String,
    pub segment_duration_secs: u32,
    /// Upper bound on one job, including every tier of a segmented job.
    pub timeout_secs: u64,
    pub tiers: Vec<QualityTier>,
}

fn default_tiers() -> Vec<QualityTier> {
    vec![QualityTier {
        name: "480p".into(),
        resolution: "854x480".into(),
        video_bitrate: "1M".into(),
        audio_bitrate: "96k".into(),
    }]
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            layout: ArtifactLayout::File,
            video_crf: 23,
            video_preset: "fast".into(),
            audio_bitrate: "128k".into(),
            segment_duration_secs: 10,
            timeout_secs: 3600,
            tiers: default_tiers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.request_timeout_secs, 30);
        assert_eq!(cfg.streaming.default_window_bytes, 1024 * 1024);
        assert_eq!(cfg.streaming.max_slice_bytes, 100 * 1024 * 1024);
        assert_eq!(cfg.transcode.video_crf, 23);
        assert_eq!(cfg.transcode.layout, ArtifactLayout::File);
        assert_eq!(cfg.transcode.tiers.len(), 1);
    }

    #[test]
    fn default_config_no_warnings() {
        let cfg = Config::default();
        let warnings = cfg.validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{"server": {"port": 9090}, "transcode": {"layout": "segmented"}}"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.transcode.layout, ArtifactLayout::Segmented);
        assert_eq!(cfg.transcode.video_preset, "fast");
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.storage.upload_dir, PathBuf::from("./data/uploads"));
    }

    #[test]
    fn parse_invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_or_default(Some(&dir.path().join("nope.json")));
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn load_or_default_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vidstream.json");
        std::fs::write(&path, r#"{"storage": {"upload_dir": "/srv/video"}}"#).unwrap();
        let cfg = Config::load_or_default(Some(&path));
        assert_eq!(cfg.storage.upload_dir, PathBuf::from("/srv/video"));
        assert_eq!(cfg.storage.incoming_dir(), PathBuf::from("/srv/video/.incoming"));
    }

    #[test]
    fn segmented_without_tiers_warns() {
        let mut cfg = Config::default();
        cfg.transcode.layout = ArtifactLayout::Segmented;
        cfg.transcode.tiers.clear();
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("no tiers")));
    }

    #[test]
    fn oversized_window_warns() {
        let mut cfg = Config::default();
        cfg.streaming.open_end_cap_bytes = cfg.streaming.max_slice_bytes + 1;
        assert!(cfg.validate().iter().any(|w| w.contains("max_slice_bytes")));
    }

    #[test]
    fn tier_name_with_path_separator_warns() {
        let mut cfg = Config::default();
        cfg.transcode.tiers[0].name = "../480p".into();
        assert!(cfg.validate().iter().any(|w| w.contains("tiers[0]")));
    }
}
