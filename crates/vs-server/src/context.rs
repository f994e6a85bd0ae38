//! Application context shared by every request handler and transcode job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::task::TaskTracker;
use vs_av::ToolRegistry;
use vs_core::config::Config;
use vs_db::pool::DbPool;
use vs_media::RangePolicy;

use crate::transcode::Transcoder;

/// Application context shared by all request handlers (via Axum state).
///
/// This is cheaply cloneable because it only holds `Arc`s, the pool handle
/// and the job tracker.
#[derive(Clone)]
pub struct AppContext {
    /// Database connection pool.
    pub db: DbPool,
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// External tool registry.
    pub tools: Arc<ToolRegistry>,
    /// Produces playable artifacts from raw uploads.
    pub transcoder: Arc<dyn Transcoder>,
    /// In-flight transcode jobs, drained on shutdown.
    pub jobs: TaskTracker,
}

impl AppContext {
    pub fn new(
        db: DbPool,
        config: Arc<Config>,
        tools: Arc<ToolRegistry>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            db,
            config,
            tools,
            transcoder,
            jobs: TaskTracker::new(),
        }
    }

    /// Root directory holding every artifact.
    pub fn upload_dir(&self) -> &Path {
        &self.config.storage.upload_dir
    }

    /// Location of the artifact stored under `file_name`.
    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.upload_dir().join(file_name)
    }

    /// Range defaults from the streaming config.
    pub fn range_policy(&self) -> RangePolicy {
        RangePolicy {
            default_window: self.config.streaming.default_window_bytes,
            open_end_cap: self.config.streaming.open_end_cap_bytes,
        }
    }
}
