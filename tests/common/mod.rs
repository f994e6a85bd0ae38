//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a temporary
//! upload directory and a full [`AppContext`] around a fake transcoder. The
//! [`TestHarness::with_server`] constructors start Axum on a random port for
//! HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use vs_av::ToolRegistry;
use vs_core::config::Config;
use vs_core::{ArtifactLayout, ConversionStatus};
use vs_db::models::VideoRecord;
use vs_db::pool::{init_memory_pool, DbPool};
use vs_server::context::AppContext;
use vs_server::transcode::{TranscodeJob, Transcoder};

// ---------------------------------------------------------------------------
// Fake transcoders
// ---------------------------------------------------------------------------

/// Copies the raw upload into place. Segmented jobs get a one-tier asset
/// directory whose only segment holds the upload bytes.
pub struct CopyTranscoder;

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(&self, job: &TranscodeJob) -> vs_core::Result<()> {
        write_artifact(job).await
    }
}

/// Writes some partial output, then fails like a crashing ffmpeg.
pub struct FailingTranscoder;

#[async_trait]
impl Transcoder for FailingTranscoder {
    async fn transcode(&self, job: &TranscodeJob) -> vs_core::Result<()> {
        match job.layout {
            ArtifactLayout::File => tokio::fs::write(&job.output, b"partial").await?,
            ArtifactLayout::Segmented => {
                tokio::fs::create_dir_all(&job.output).await?;
                tokio::fs::write(job.output.join("480p_000.ts"), b"partial").await?;
            }
        }
        Err(vs_core::Error::tool("ffmpeg", "exited with status 1: Invalid data"))
    }
}

/// Never finishes.
pub struct HangingTranscoder;

#[async_trait]
impl Transcoder for HangingTranscoder {
    async fn transcode(&self, job: &TranscodeJob) -> vs_core::Result<()> {
        tokio::fs::write(&job.output, b"partial").await?;
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Copies like [`CopyTranscoder`] once the gate is opened.
pub struct GatedTranscoder {
    pub gate: Arc<Notify>,
}

#[async_trait]
impl Transcoder for GatedTranscoder {
    async fn transcode(&self, job: &TranscodeJob) -> vs_core::Result<()> {
        self.gate.notified().await;
        write_artifact(job).await
    }
}

async fn write_artifact(job: &TranscodeJob) -> vs_core::Result<()> {
    match job.layout {
        ArtifactLayout::File => {
            tokio::fs::copy(&job.input, &job.output).await?;
        }
        ArtifactLayout::Segmented => {
            tokio::fs::create_dir_all(&job.output).await?;
            tokio::fs::copy(&job.input, job.output.join("480p_000.ts")).await?;
            tokio::fs::write(
                job.output.join("480p.m3u8"),
                "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXTINF:10.0,\n480p_000.ts\n#EXT-X-ENDLIST\n",
            )
            .await?;
            tokio::fs::write(
                job.output.join("main.m3u8"),
                "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-STREAM-INF:BANDWIDTH=1096000,RESOLUTION=854x480\n480p.m3u8\n",
            )
            .await?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database and a temporary upload directory.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub cancel: CancellationToken,
    server: Option<JoinHandle<vs_core::Result<()>>>,
    _dir: tempfile::TempDir,
}

impl TestHarness {
    /// Default configuration with a copying transcoder.
    pub fn new() -> Self {
        Self::with_config(Config::default(), Arc::new(CopyTranscoder))
    }

    /// Custom configuration and transcoder. `storage.upload_dir` is always
    /// replaced by a fresh temporary directory.
    pub fn with_config(mut config: Config, transcoder: Arc<dyn Transcoder>) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        config.storage.upload_dir = dir.path().join("uploads");
        std::fs::create_dir_all(config.storage.incoming_dir()).expect("failed to create upload dir");

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let ctx = AppContext::new(
            db.clone(),
            Arc::new(config),
            Arc::new(ToolRegistry::default()),
            transcoder,
        );

        Self {
            ctx,
            db,
            cancel: CancellationToken::new(),
            server: None,
            _dir: dir,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    /// Start a server with custom config and transcoder on a random port.
    pub async fn with_server_config(
        config: Config,
        transcoder: Arc<dyn Transcoder>,
    ) -> (Self, SocketAddr) {
        Self::with_config(config, transcoder).serve().await
    }

    /// Serve this harness's context on a random port.
    pub async fn serve(mut self) -> (Self, SocketAddr) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        let ctx = self.ctx.clone();
        let cancel = self.cancel.clone();
        self.server = Some(tokio::spawn(vs_server::serve(ctx, listener, cancel)));

        (self, addr)
    }

    /// Cancel the server and wait for its graceful shutdown to finish.
    pub async fn shutdown(&mut self) -> vs_core::Result<()> {
        self.cancel.cancel();
        match self.server.take() {
            Some(handle) => handle.await.expect("server task panicked"),
            None => Ok(()),
        }
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> vs_db::pool::PooledConnection {
        vs_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    pub fn upload_dir(&self) -> &Path {
        self.ctx.upload_dir()
    }

    pub fn incoming_dir(&self) -> PathBuf {
        self.ctx.config.storage.incoming_dir()
    }

    pub fn record(&self, file_name: &str) -> Option<VideoRecord> {
        vs_db::queries::videos::get_video_by_file_name(&self.conn(), file_name)
            .expect("record lookup failed")
    }

    /// Store `data` as a ready single-file artifact named `file_name`.
    pub fn seed_ready(&self, file_name: &str, data: &[u8]) -> VideoRecord {
        std::fs::write(self.ctx.artifact_path(file_name), data).expect("failed to write artifact");
        let conn = self.conn();
        vs_db::queries::videos::insert_video(&conn, file_name, file_name, ArtifactLayout::File)
            .expect("insert failed");
        vs_db::queries::videos::mark_ready(&conn, file_name, data.len() as u64)
            .expect("mark_ready failed");
        self.record(file_name).expect("seeded record missing")
    }

    /// Poll until the record reaches `status`, or panic after five seconds.
    pub async fn wait_for_status(&self, file_name: &str, status: ConversionStatus) -> VideoRecord {
        self.wait_until(|| self.record(file_name).filter(|r| r.status == status))
            .await
            .unwrap_or_else(|| panic!("{file_name} never reached {status}"))
    }

    /// Poll until the record is gone, or panic after five seconds.
    pub async fn wait_for_removal(&self, file_name: &str) {
        self.wait_until(|| self.record(file_name).is_none().then_some(()))
            .await
            .unwrap_or_else(|| panic!("{file_name} was never removed"));
    }

    async fn wait_until<T>(&self, mut check: impl FnMut() -> Option<T>) -> Option<T> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(v) = check() {
                return Some(v);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// POST `data` as the `video` field of a multipart upload.
pub async fn upload(addr: SocketAddr, name: &str, data: Vec<u8>) -> reqwest::Response {
    let part = reqwest::multipart::Part::bytes(data).file_name(name.to_string());
    let form = reqwest::multipart::Form::new().part("video", part);
    reqwest::Client::new()
        .post(format!("http://{addr}/api/videos"))
        .multipart(form)
        .send()
        .await
        .expect("upload request failed")
}

/// GET the stream endpoint with an optional `Range` header.
pub async fn stream(addr: SocketAddr, file_name: &str, range: Option<&str>) -> reqwest::Response {
    let mut req = reqwest::Client::new()
        .get(format!("http://{addr}/api/videos/stream"))
        .query(&[("file_name", file_name)]);
    if let Some(range) = range {
        req = req.header("range", range);
    }
    req.send().await.expect("stream request failed")
}

/// DELETE `file_name`.
pub async fn delete(addr: SocketAddr, file_name: &str) -> reqwest::Response {
    reqwest::Client::new()
        .delete(format!("http://{addr}/api/videos"))
        .query(&[("file_name", file_name)])
        .send()
        .await
        .expect("delete request failed")
}

/// `n` bytes of a repeating, position-dependent pattern.
pub fn pattern(n: usize) -> Vec<u8> {
    (0..n).map(|i| (i % 251) as u8).collect()
}
