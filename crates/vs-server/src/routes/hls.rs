//! Segmented playback assets: master/media playlists and segments.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;
use vs_core::{ArtifactLayout, Error};
use vs_media::hls_content_type;

use crate::context::AppContext;
use crate::coordinator::check_stored_name;
use crate::error::AppError;

/// Split a sub-path into its components, rejecting anything that could
/// leave the asset directory.
fn asset_components(file: &str) -> Option<Vec<&str>> {
    if file.is_empty() || file.contains('\\') || file.contains('\0') {
        return None;
    }
    let parts: Vec<&str> = file.split('/').collect();
    if parts.iter().any(|p| p.is_empty() || *p == "." || *p == "..") {
        return None;
    }
    Some(parts)
}

/// GET /hls/{asset}
pub async fn hls_missing_file(Path(_asset): Path<String>) -> AppError {
    AppError::new(Error::Validation("Invalid HLS path".into()))
}

/// GET /hls/{asset}/{*file}
///
/// Serves files of a ready segmented asset. Malformed paths are 400, a
/// missing asset or file 404, and a directory 403. The content type comes
/// from the suffix.
pub async fn hls_asset(
    State(ctx): State<AppContext>,
    Path((asset, file)): Path<(String, String)>,
) -> Result<Response, AppError> {
    check_stored_name(&asset).map_err(|_| Error::Validation("Invalid HLS path".into()))?;
    let parts = asset_components(&file)
        .ok_or_else(|| Error::Validation("Invalid HLS path".into()))?;

    let record = {
        let conn = vs_db::pool::get_conn(&ctx.db)?;
        vs_db::queries::videos::get_video_by_file_name(&conn, &asset)?
    };
    match record {
        Some(r) if r.is_ready() && r.layout == ArtifactLayout::Segmented => {}
        _ => return Err(Error::not_found("HLS asset", &asset).into()),
    }

    let mut path = ctx.artifact_path(&asset);
    path.extend(&parts);

    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::not_found("HLS file", format!("{asset}/{file}")).into())
        }
        Err(e) => return Err(Error::from(e).into()),
    };
    if meta.is_dir() {
        return Err(Error::Forbidden("Not a file".into()).into());
    }

    let content_type = hls_content_type(&file).unwrap_or_else(|| {
        tracing::warn!(asset = %asset, file = %file, "Unknown HLS file type");
        "application/octet-stream"
    });

    let handle = tokio::fs::File::open(&path).await.map_err(Error::from)?;
    let body = Body::from_stream(ReaderStream::with_capacity(handle, 64 * 1024));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE.as_str(), content_type.to_string()),
            (header::CONTENT_LENGTH.as_str(), meta.len().to_string()),
        ],
        body,
    )
        .into_response())
}
