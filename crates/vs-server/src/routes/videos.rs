//! Upload, list and delete handlers.

use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::Serialize;
use vs_core::ConversionStatus;
use vs_db::models::VideoRecord;

use crate::context::AppContext;
use crate::coordinator;
use crate::error::AppError;
use crate::routes::FileNameQuery;

/// Multipart field carrying the video file.
pub const UPLOAD_FIELD: &str = "video";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub filename: String,
    pub status: ConversionStatus,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: &'static str,
    pub filename: String,
    pub file_already_missing: bool,
}

/// POST /api/videos
///
/// Stores the `video` field and schedules its transcode. Returns as soon as
/// the raw bytes are durable; the record stays `pending` until the job ends.
pub async fn upload_video(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| vs_core::Error::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let display_name = field
            .file_name()
            .filter(|n| !n.is_empty())
            .map(String::from)
            .ok_or_else(|| vs_core::Error::Validation("Uploaded file has no name".into()))?;

        let record = coordinator::accept_upload(&ctx, &display_name, field).await?;

        return Ok(Json(UploadResponse {
            message: "Video uploaded, processing started",
            filename: record.file_name,
            status: record.status,
        }));
    }

    Err(vs_core::Error::Validation(format!("Multipart field '{UPLOAD_FIELD}' is required")).into())
}

/// GET /api/videos
pub async fn list_videos(
    State(ctx): State<AppContext>,
) -> Result<Json<Vec<VideoRecord>>, AppError> {
    let conn = vs_db::pool::get_conn(&ctx.db)?;
    let videos = vs_db::queries::videos::list_videos(&conn)?;
    Ok(Json(videos))
}

/// DELETE /api/videos?file_name=
pub async fn delete_video(
    State(ctx): State<AppContext>,
    Query(query): Query<FileNameQuery>,
) -> Result<Json<DeleteResponse>, AppError> {
    let file_name = query.require()?;
    let outcome = coordinator::delete(&ctx, &file_name).await?;

    Ok(Json(DeleteResponse {
        message: outcome.message(),
        filename: file_name,
        file_already_missing: outcome.file_already_missing(),
    }))
}
