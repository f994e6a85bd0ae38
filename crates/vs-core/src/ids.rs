//! Identifiers.
//!
//! Records and jobs are keyed by random v4 UUIDs. Stored file names use a
//! separate opaque stem so nothing on disk is derived from the user's input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary key of a video record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(Uuid);

impl VideoId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Parses the hyphenated form written to the `videos.id` column.
impl FromStr for VideoId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Tags the log lines of one transcode job. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobId(Uuid);

impl JobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Generate a fresh opaque storage stem (32 lowercase hex characters).
///
/// Stored filenames are built from this stem; it is never derived from the
/// user-supplied name.
pub fn new_storage_stem() -> String {
    Uuid::new_v4().simple().to_string()
}
