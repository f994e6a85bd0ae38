//! Video record CRUD and status transitions.
//!
//! Every operation is a single statement, so updates to one `file_name`
//! are serialized by SQLite without any application-level lock.

use chrono::Utc;
use rusqlite::Connection;
use vs_core::{ArtifactLayout, ConversionStatus, Error, Result, VideoId};

use crate::models::VideoRecord;

const COLS: &str = "id, display_name, file_name, layout, size, status, error, created_at, updated_at";

/// Insert a new `pending` record with size 0.
///
/// A duplicate `file_name` is reported as [`Error::Conflict`].
pub fn insert_video(
    conn: &Connection,
    display_name: &str,
    file_name: &str,
    layout: ArtifactLayout,
) -> Result<VideoRecord> {
    let id = VideoId::new();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO videos (id, display_name, file_name, layout, size, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 0, 'pending', ?5, ?5)",
        rusqlite::params![id.to_string(), display_name, file_name, layout.as_str(), &now],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::Conflict(format!("file_name '{file_name}' already exists"))
        }
        other => Error::database(other.to_string()),
    })?;

    Ok(VideoRecord {
        id,
        display_name: display_name.to_string(),
        file_name: file_name.to_string(),
        layout,
        size: 0,
        status: ConversionStatus::Pending,
        error: None,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Look up a record by its stored file name.
pub fn get_video_by_file_name(conn: &Connection, file_name: &str) -> Result<Option<VideoRecord>> {
    let q = format!("SELECT {COLS} FROM videos WHERE file_name = ?1");
    match conn.query_row(&q, [file_name], VideoRecord::from_row) {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// All records, oldest first.
pub fn list_videos(conn: &Connection) -> Result<Vec<VideoRecord>> {
    let q = format!("SELECT {COLS} FROM videos ORDER BY created_at ASC, file_name ASC");
    query_list(conn, &q)
}

/// Records still waiting on a transcode.
pub fn list_pending_videos(conn: &Connection) -> Result<Vec<VideoRecord>> {
    let q = format!("SELECT {COLS} FROM videos WHERE status = 'pending' ORDER BY created_at ASC");
    query_list(conn, &q)
}

fn query_list(conn: &Connection, q: &str) -> Result<Vec<VideoRecord>> {
    let mut stmt = conn.prepare(q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], VideoRecord::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Transition a pending record to `ready` with the final artifact size.
///
/// Returns `false` if no pending record matched (already transitioned or
/// deleted).
pub fn mark_ready(conn: &Connection, file_name: &str, size: u64) -> Result<bool> {
    let size = i64::try_from(size)
        .map_err(|_| Error::Internal(format!("artifact size {size} does not fit in i64")))?;
    let now = Utc::now().to_rfc3339();
    let changed = conn
        .execute(
            "UPDATE videos SET status = 'ready', size = ?1, error = NULL, updated_at = ?2
             WHERE file_name = ?3 AND status = 'pending'",
            rusqlite::params![size, &now, file_name],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(changed > 0)
}

/// Transition a pending record to `failed`, keeping the message.
///
/// Returns `false` if no pending record matched.
pub fn mark_failed(conn: &Connection, file_name: &str, message: &str) -> Result<bool> {
    let now = Utc::now().to_rfc3339();
    let changed = conn
        .execute(
            "UPDATE videos SET status = 'failed', error = ?1, updated_at = ?2
             WHERE file_name = ?3 AND status = 'pending'",
            rusqlite::params![message, &now, file_name],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(changed > 0)
}

/// Delete a record. Returns `true` if a row was removed.
pub fn delete_video_by_file_name(conn: &Connection, file_name: &str) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM videos WHERE file_name = ?1", [file_name])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
