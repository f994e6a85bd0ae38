//! Slice Reader: fetch the bytes of a resolved range from disk.
//!
//! The file is re-examined at read time because it may have been replaced
//! or truncated since the range was resolved. The reader never reads past
//! the current end of file and never allocates more than the caller's
//! ceiling.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use bytes::Bytes;
use vs_core::{Error, Result};

use crate::range::ByteRange;

/// Bytes actually read for a range, plus the file size observed at read time.
#[derive(Debug, Clone)]
pub struct Slice {
    pub start: u64,
    pub data: Bytes,
    pub file_size: u64,
}

impl Slice {
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Inclusive end offset of the bytes read, or `None` for an empty slice.
    pub fn end(&self) -> Option<u64> {
        (!self.is_empty()).then(|| self.start + self.len() - 1)
    }

    /// `Content-Range` value describing exactly what was read.
    pub fn content_range(&self) -> Option<String> {
        self.end()
            .map(|end| format!("bytes {}-{}/{}", self.start, end, self.file_size))
    }
}

/// Read the bytes of `range` from `path`.
///
/// - `end` is re-clamped to the file's current size; a start at or beyond
///   the current size yields an empty slice.
/// - More than `max_bytes` is refused with [`Error::Validation`] before any
///   buffer is allocated.
/// - A short read (file truncated mid-read) returns the bytes that were
///   available.
///
/// This is blocking I/O; async callers should run it on a blocking thread.
pub fn read_slice(path: &Path, range: &ByteRange, max_bytes: u64) -> Result<Slice> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        // Only the file name: the message reaches clients.
        std::io::ErrorKind::NotFound => Error::not_found(
            "file",
            path.file_name().unwrap_or_default().to_string_lossy(),
        ),
        _ => Error::from(e),
    })?;
    let file_size = file.metadata()?.len();
    let start = range.start();

    if start >= file_size {
        return Ok(Slice {
            start,
            data: Bytes::new(),
            file_size,
        });
    }

    let end = range.end().min(file_size - 1);
    let count = end - start + 1;
    if count > max_bytes {
        return Err(Error::Validation(format!(
            "requested {count} bytes exceeds the per-request limit of {max_bytes}"
        )));
    }

    file.seek(SeekFrom::Start(start))?;
    let capacity = usize::try_from(count)
        .map_err(|_| Error::Internal(format!("slice of {count} bytes does not fit in memory")))?;
    let mut buf = Vec::with_capacity(capacity);
    file.take(count).read_to_end(&mut buf)?;

    Ok(Slice {
        start,
        data: Bytes::from(buf),
        file_size,
    })
}
