//! Keeps video records and artifacts on disk in agreement.
//!
//! Every path that touches both orders its writes so the record never
//! claims more than the filesystem holds:
//!
//! - upload inserts a `pending` record before the raw bytes are durable and
//!   removes it again if they never become durable;
//! - job completion is the only place a record leaves `pending`;
//! - delete removes the artifact first and the record second. If the
//!   second step fails after the first succeeded, the caller gets
//!   [`Error::Inconsistency`].
//!
//! There is no lock spanning the store and the filesystem. Each record
//! update is a single statement and each upload owns a unique stem.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;

use vs_core::{new_storage_stem, upload_extension, ArtifactLayout, ConversionStatus, Error, JobId, Result};
use vs_db::models::VideoRecord;
use vs_db::pool::{get_conn, DbPool};
use vs_db::queries::videos;

use crate::context::AppContext;
use crate::transcode::{self, remove_artifact, JobOutcome, TranscodeJob};

/// What a successful delete actually removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Artifact and record were both removed.
    Deleted,
    /// The artifact was already gone; only the record was removed.
    RecordOnly,
}

impl DeleteOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            DeleteOutcome::Deleted => "Video successfully deleted",
            DeleteOutcome::RecordOnly => "Video record cleaned up (file was already missing)",
        }
    }

    pub fn file_already_missing(&self) -> bool {
        matches!(self, DeleteOutcome::RecordOnly)
    }
}

/// Reject names that could address anything other than a direct child of
/// the upload directory.
pub fn check_stored_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("file_name is required".into()));
    }
    if name.starts_with('.') || name.contains(['/', '\\', '\0']) {
        return Err(Error::Validation(format!("invalid file_name '{name}'")));
    }
    Ok(())
}

/// Stored name for a new upload: `<stem>.mp4` or an asset directory `<stem>`.
fn stored_name(stem: &str, layout: ArtifactLayout) -> String {
    match layout {
        ArtifactLayout::File => format!("{stem}.mp4"),
        ArtifactLayout::Segmented => stem.to_string(),
    }
}

/// Accept an upload and schedule its transcode.
///
/// The extension of `display_name` must be on the allow-list. The record is
/// inserted as `pending` first, then `body` is streamed to
/// `<upload_dir>/.incoming/<stem>.<ext>` and synced. If the body cannot be
/// read or written (or this future is dropped mid-way) the partial file and
/// the record are removed again.
pub async fn accept_upload<S, E>(ctx: &AppContext, display_name: &str, body: S) -> Result<VideoRecord>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send,
    E: Display,
{
    let ext = upload_extension(display_name)?;
    let layout = ctx.config.transcode.layout;
    let stem = new_storage_stem();
    let file_name = stored_name(&stem, layout);

    let input = ctx.config.storage.incoming_dir().join(format!("{stem}.{ext}"));

    let record = {
        let conn = get_conn(&ctx.db)?;
        videos::insert_video(&conn, display_name, &file_name, layout)?
    };
    let mut guard = UploadGuard {
        db: ctx.db.clone(),
        file_name: file_name.clone(),
        input: input.clone(),
        armed: true,
    };

    let written = write_body(&input, body).await?;
    guard.armed = false;

    tracing::info!(
        file_name = %file_name,
        display_name,
        bytes = written,
        "Upload stored, scheduling transcode"
    );

    transcode::spawn(
        ctx,
        TranscodeJob {
            id: JobId::new(),
            output: ctx.artifact_path(&file_name),
            file_name,
            input,
            layout,
        },
    );

    Ok(record)
}

async fn write_body<S, E>(path: &Path, body: S) -> Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Display,
{
    let mut body = std::pin::pin!(body);
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            tracing::error!("Failed to create {}: {e}", dir.display());
            Error::Internal("failed to store upload".into())
        })?;
    }
    let mut file = tokio::fs::File::create(path).await.map_err(|e| {
        tracing::error!("Failed to create {}: {e}", path.display());
        Error::Internal("failed to store upload".into())
    })?;

    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk
            .map_err(|e| Error::Validation(format!("upload body could not be read: {e}")))?;
        file.write_all(&chunk).await.map_err(|e| {
            tracing::error!("Failed writing {}: {e}", path.display());
            Error::Internal("failed to store upload".into())
        })?;
        written += chunk.len() as u64;
    }

    file.sync_all().await.map_err(|e| {
        tracing::error!("Failed to sync {}: {e}", path.display());
        Error::Internal("failed to store upload".into())
    })?;

    Ok(written)
}

/// Rolls back a half-finished upload unless disarmed.
struct UploadGuard {
    db: DbPool,
    file_name: String,
    input: PathBuf,
    armed: bool,
}

// Runs on the async worker: one unlink and one single-row delete, both short.
impl Drop for UploadGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        if let Err(e) = std::fs::remove_file(&self.input) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove partial upload {}: {e}", self.input.display());
            }
        }

        let deleted = get_conn(&self.db)
            .and_then(|conn| videos::delete_video_by_file_name(&conn, &self.file_name));
        match deleted {
            Ok(_) => tracing::info!(file_name = %self.file_name, "Upload rolled back"),
            Err(e) => tracing::error!(
                file_name = %self.file_name,
                "Failed to roll back upload record: {e}; it will be recovered on next start"
            ),
        }
    }
}

/// Apply a job's terminal outcome to its record.
///
/// Success marks the record ready with the artifact size. If the record is
/// no longer pending (deleted while the job ran) the artifact is removed.
/// Failure marks the record failed and then deletes it.
pub async fn complete(ctx: &AppContext, job: &TranscodeJob, outcome: &JobOutcome) -> Result<()> {
    match outcome {
        JobOutcome::Succeeded { size } => {
            let updated = {
                let conn = get_conn(&ctx.db)?;
                videos::mark_ready(&conn, &job.file_name, *size)?
            };
            if !updated {
                tracing::warn!(
                    file_name = %job.file_name,
                    "Record is no longer pending; removing orphaned artifact"
                );
                remove_artifact(&job.output, job.layout).await?;
            }
        }
        JobOutcome::Failed { message } => {
            let conn = get_conn(&ctx.db)?;
            videos::mark_failed(&conn, &job.file_name, message)?;
            videos::delete_video_by_file_name(&conn, &job.file_name)?;
        }
    }
    Ok(())
}

/// Delete a video's artifact and then its record.
pub async fn delete(ctx: &AppContext, file_name: &str) -> Result<DeleteOutcome> {
    check_stored_name(file_name)?;

    let record = {
        let conn = get_conn(&ctx.db)?;
        videos::get_video_by_file_name(&conn, file_name)?
    }
    .ok_or_else(|| Error::not_found("video", file_name))?;

    let path = ctx.artifact_path(&record.file_name);
    let removed = remove_artifact(&path, record.layout).await.map_err(|e| {
        tracing::error!(file_name, "Failed to delete {}: {e}", path.display());
        Error::Internal(format!("failed to delete video file '{file_name}'"))
    })?;

    let deleted =
        get_conn(&ctx.db).and_then(|conn| videos::delete_video_by_file_name(&conn, file_name));
    match deleted {
        Ok(_) if removed => Ok(DeleteOutcome::Deleted),
        Ok(_) => {
            tracing::info!(file_name, "Artifact was already missing; record removed");
            Ok(DeleteOutcome::RecordOnly)
        }
        Err(e) if removed => Err(Error::Inconsistency(format!(
            "artifact '{file_name}' was deleted but its record could not be removed: {e}"
        ))),
        Err(e) => Err(e),
    }
}

/// Clear out work a previous process left unfinished.
///
/// Records still `pending` (or `failed` but not yet deleted) can never
/// complete: their partial artifacts and records are removed. Stray raw
/// uploads under `.incoming/` are deleted. Returns the number of records
/// removed.
pub async fn recover_orphans(ctx: &AppContext) -> Result<usize> {
    let conn = get_conn(&ctx.db)?;
    let mut stale = videos::list_pending_videos(&conn)?;
    stale.extend(
        videos::list_videos(&conn)?
            .into_iter()
            .filter(|v| v.status == ConversionStatus::Failed),
    );
    drop(conn);

    let mut recovered = 0;
    for record in &stale {
        let path = ctx.artifact_path(&record.file_name);
        if let Err(e) = remove_artifact(&path, record.layout).await {
            tracing::warn!(
                file_name = %record.file_name,
                "Cannot remove unfinished artifact {}: {e}; keeping record",
                path.display()
            );
            continue;
        }
        let conn = get_conn(&ctx.db)?;
        videos::delete_video_by_file_name(&conn, &record.file_name)?;
        tracing::info!(file_name = %record.file_name, "Removed unfinished upload from a previous run");
        recovered += 1;
    }

    let incoming = ctx.config.storage.incoming_dir();
    let mut entries = match tokio::fs::read_dir(&incoming).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(recovered),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = entries.next_entry().await? {
        if let Err(e) = tokio::fs::remove_file(entry.path()).await {
            tracing::warn!("Failed to remove stray upload {}: {e}", entry.path().display());
        }
    }

    Ok(recovered)
}
