//! Ranged progressive streaming of single-file artifacts.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use vs_core::{ArtifactLayout, ConversionStatus, Error};
use vs_media::{guess_content_type, read_slice, resolve};

use crate::context::AppContext;
use crate::coordinator::check_stored_name;
use crate::error::AppError;
use crate::routes::FileNameQuery;

/// GET /api/videos/stream?file_name=
///
/// Always answers 206 with at most `streaming.max_slice_bytes` bytes. A
/// missing `Range` header gets the configured default window; `bytes=N-`
/// gets the open-end cap. The range is resolved against the size on disk,
/// not the size recorded at transcode time.
pub async fn stream_video(
    State(ctx): State<AppContext>,
    Query(query): Query<FileNameQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let file_name = query.require()?;
    check_stored_name(&file_name)?;

    let record = {
        let conn = vs_db::pool::get_conn(&ctx.db)?;
        vs_db::queries::videos::get_video_by_file_name(&conn, &file_name)?
    }
    .ok_or_else(|| Error::not_found("video", &file_name))?;

    match record.status {
        ConversionStatus::Ready => {}
        ConversionStatus::Pending => {
            return Err(Error::Conflict(format!("video '{file_name}' is still processing")).into())
        }
        ConversionStatus::Failed => return Err(Error::not_found("video", &file_name).into()),
    }
    if record.layout == ArtifactLayout::Segmented {
        return Err(Error::Validation(format!(
            "video '{file_name}' is segmented; play /hls/{file_name}/main.m3u8"
        ))
        .into());
    }

    let path = ctx.artifact_path(&record.file_name);
    let size = match tokio::fs::metadata(&path).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::not_found("file", &file_name).into())
        }
        Err(e) => return Err(Error::from(e).into()),
    };

    let range_header = headers
        .get(header::RANGE)
        .map(|v| {
            v.to_str()
                .map_err(|_| Error::Validation("Range header is not valid ASCII".into()))
        })
        .transpose()?;

    let max_slice = ctx.config.streaming.max_slice_bytes;
    let range = resolve(range_header, size, &ctx.range_policy())?.limit(max_slice);

    let slice = tokio::task::spawn_blocking(move || read_slice(&path, &range, max_slice))
        .await
        .map_err(|e| Error::Internal(format!("slice reader task failed: {e}")))??;

    // The file shrank below the start between stat and read.
    let Some(content_range) = slice.content_range() else {
        return Err(Error::RangeNotSatisfiable {
            size: slice.file_size,
        }
        .into());
    };

    tracing::debug!(
        file_name = %file_name,
        start = slice.start,
        end = slice.end(),
        size = slice.file_size,
        "Serving slice"
    );

    Ok((
        StatusCode::PARTIAL_CONTENT,
        [
            (
                header::CONTENT_TYPE.as_str(),
                guess_content_type(&record.file_name).to_string(),
            ),
            (header::CONTENT_RANGE.as_str(), content_range),
            (header::CONTENT_LENGTH.as_str(), slice.len().to_string()),
            (header::ACCEPT_RANGES.as_str(), "bytes".to_string()),
        ],
        Body::from(slice.data),
    )
        .into_response())
}
