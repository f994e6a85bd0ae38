//! Background transcode jobs.
//!
//! A job turns one raw upload into a playable artifact. The worker runs the
//! [`Transcoder`] and reports through a oneshot channel, so exactly one
//! result is ever observed. The supervisor bounds the wait with
//! `transcode.timeout_secs`, aborts the worker on expiry (killing ffmpeg via
//! `kill_on_drop`), performs cleanup once and hands the [`JobOutcome`] to the
//! coordinator.
//!
//! Jobs run on the context's `TaskTracker`, never on the request task, so a
//! dropped or timed-out HTTP request cannot cancel them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::Instrument;

use vs_av::ToolRegistry;
use vs_core::config::TranscodeConfig;
use vs_core::{ArtifactLayout, Error, JobId};

use crate::context::AppContext;
use crate::coordinator;

/// Produces the artifact for a job at `job.output`.
///
/// Implementations report failure through the returned error; cleanup of
/// both paths is done by the caller.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, job: &TranscodeJob) -> vs_core::Result<()>;
}

/// ffmpeg-backed [`Transcoder`].
pub struct FfmpegTranscoder {
    tools: Arc<ToolRegistry>,
    config: TranscodeConfig,
}

impl FfmpegTranscoder {
    pub fn new(tools: Arc<ToolRegistry>, config: TranscodeConfig) -> Self {
        Self { tools, config }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, job: &TranscodeJob) -> vs_core::Result<()> {
        match job.layout {
            ArtifactLayout::File => {
                vs_av::convert_to_mp4(&self.tools, &job.input, &job.output, &self.config).await
            }
            ArtifactLayout::Segmented => {
                let out =
                    vs_av::encode_adaptive_hls(&self.tools, &job.input, &job.output, &self.config)
                        .await?;
                tracing::info!(job_id = %job.id, tiers = ?out.tiers, "HLS tiers encoded");
                Ok(())
            }
        }
    }
}

/// One unit of transcode work.
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub id: JobId,
    /// Stored name of the record this job completes.
    pub file_name: String,
    /// Raw upload, removed when the job ends.
    pub input: PathBuf,
    /// Artifact path: a file or an asset directory depending on `layout`.
    pub output: PathBuf,
    pub layout: ArtifactLayout,
}

/// Terminal result of a job. Produced exactly once per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded { size: u64 },
    Failed { message: String },
}

/// Schedule `job` on the context's tracker and return immediately.
pub fn spawn(ctx: &AppContext, job: TranscodeJob) {
    let span = tracing::info_span!("transcode", job_id = %job.id, file_name = %job.file_name);
    let ctx = ctx.clone();

    ctx.jobs.clone().spawn(
        async move {
            let timeout = Duration::from_secs(ctx.config.transcode.timeout_secs);
            tracing::info!(layout = %job.layout, "Transcode job started");

            let outcome = run_job(ctx.transcoder.clone(), &job, timeout).await;
            match &outcome {
                JobOutcome::Succeeded { size } => {
                    tracing::info!(size, "Transcode job succeeded")
                }
                JobOutcome::Failed { message } => {
                    tracing::error!(error = %message, "Transcode job failed")
                }
            }

            if let Err(e) = coordinator::complete(&ctx, &job, &outcome).await {
                tracing::error!(
                    "Failed to record transcode outcome: {e}; the record will be recovered on next start"
                );
            }
        }
        .instrument(span),
    );
}

/// Run one job to its terminal outcome and clean up after it.
///
/// The input is always removed. On failure the output (file or directory)
/// is removed too. A successful run that leaves no artifact, or an empty
/// one, counts as a failure.
pub async fn run_job(
    transcoder: Arc<dyn Transcoder>,
    job: &TranscodeJob,
    timeout: Duration,
) -> JobOutcome {
    let (tx, rx) = oneshot::channel();
    let worker_job = job.clone();
    let worker = tokio::spawn(async move {
        let result = transcoder.transcode(&worker_job).await;
        let _ = tx.send(result);
    });

    let result = match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(Error::Transcode("worker exited without a result".into())),
        Err(_) => {
            worker.abort();
            Err(Error::Transcode(format!("timed out after {timeout:?}")))
        }
    };
    // Wait for the worker to be gone before touching its files.
    let _ = worker.await;

    let outcome = match result {
        Ok(()) => match artifact_size(&job.output, job.layout).await {
            Ok(0) => JobOutcome::Failed {
                message: "transcoder produced an empty artifact".into(),
            },
            Ok(size) => JobOutcome::Succeeded { size },
            Err(e) => JobOutcome::Failed {
                message: format!("artifact unreadable after transcode: {e}"),
            },
        },
        Err(e) => JobOutcome::Failed {
            message: e.to_string(),
        },
    };

    cleanup(job, &outcome).await;
    outcome
}

/// Size of an artifact: the file length, or the total of every file in a
/// segmented asset directory.
pub async fn artifact_size(path: &Path, layout: ArtifactLayout) -> std::io::Result<u64> {
    match layout {
        ArtifactLayout::File => Ok(tokio::fs::metadata(path).await?.len()),
        ArtifactLayout::Segmented => {
            let mut total = 0;
            let mut entries = tokio::fs::read_dir(path).await?;
            while let Some(entry) = entries.next_entry().await? {
                let meta = entry.metadata().await?;
                if meta.is_file() {
                    total += meta.len();
                }
            }
            Ok(total)
        }
    }
}

/// Remove an artifact. `Ok(false)` means there was nothing to remove.
pub async fn remove_artifact(path: &Path, layout: ArtifactLayout) -> std::io::Result<bool> {
    let result = match layout {
        ArtifactLayout::File => tokio::fs::remove_file(path).await,
        ArtifactLayout::Segmented => tokio::fs::remove_dir_all(path).await,
    };
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

async fn cleanup(job: &TranscodeJob, outcome: &JobOutcome) {
    if let Err(e) = tokio::fs::remove_file(&job.input).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(job_id = %job.id, "Failed to remove upload {}: {e}", job.input.display());
        }
    }

    if matches!(outcome, JobOutcome::Failed { .. }) {
        if let Err(e) = remove_artifact(&job.output, job.layout).await {
            tracing::warn!(
                job_id = %job.id,
                "Failed to remove partial output {}: {e}",
                job.output.display()
            );
        }
    }
}
