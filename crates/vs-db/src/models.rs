//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`.

use serde::Serialize;
use vs_core::{ArtifactLayout, ConversionStatus, VideoId};

/// Parse the `id` text column.
fn parse_id(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<VideoId> {
    let s: String = row.get(idx)?;
    s.parse::<VideoId>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_enum<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = vs_core::Error>,
{
    let s: String = row.get(idx)?;
    s.parse().map_err(|e: vs_core::Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

// ---------------------------------------------------------------------------
// VideoRecord
// ---------------------------------------------------------------------------

/// One uploaded video and the state of its transcode.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRecord {
    pub id: VideoId,
    /// Name the client uploaded with. Informational only.
    pub display_name: String,
    /// Opaque stored name; the key clients use for stream and delete.
    pub file_name: String,
    pub layout: ArtifactLayout,
    /// Artifact size in bytes; 0 while pending.
    pub size: i64,
    pub status: ConversionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl VideoRecord {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            display_name: row.get(1)?,
            file_name: row.get(2)?,
            layout: parse_enum(row, 3)?,
            size: row.get(4)?,
            status: parse_enum(row, 5)?,
            error: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.status == ConversionStatus::Ready
    }
}
