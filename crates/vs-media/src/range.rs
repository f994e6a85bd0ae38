//! Range Resolver: turn a `Range` request header and a resource size into a
//! concrete inclusive byte interval.
//!
//! Only the single-range `bytes=START-END` form is understood. `START` is
//! mandatory; `END` is optional and, when omitted, the range is capped at
//! [`RangePolicy::open_end_cap`] bytes rather than running to end-of-file.
//! Suffix ranges (`bytes=-N`) and multi-range requests are malformed.

use vs_core::Error;

const MIB: u64 = 1024 * 1024;

/// Window sizes applied when the client does not pin the end of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePolicy {
    /// Bytes served when no `Range` header is present.
    pub default_window: u64,
    /// Bytes served for `bytes=START-`.
    pub open_end_cap: u64,
}

impl Default for RangePolicy {
    fn default() -> Self {
        Self {
            default_window: MIB,
            open_end_cap: 5 * MIB,
        }
    }
}

/// A resolved, inclusive `[start, end]` interval within a resource of
/// `size` bytes.
///
/// Always satisfies `start <= end < size`; the only way to obtain one is
/// through [`resolve`] or [`ByteRange::new`], both of which check it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    start: u64,
    end: u64,
    size: u64,
}

impl ByteRange {
    /// Build a range, returning `None` unless `start <= end < size`.
    pub fn new(start: u64, end: u64, size: u64) -> Option<Self> {
        (start <= end && end < size).then_some(Self { start, end, size })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Total size of the resource the range was resolved against.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of bytes covered (never zero).
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Shorten the range so it covers at most `max_len` bytes.
    ///
    /// A `max_len` of 0 is treated as 1 so the invariant still holds.
    #[must_use]
    pub fn limit(self, max_len: u64) -> Self {
        let max_len = max_len.max(1);
        if self.len() <= max_len {
            return self;
        }
        Self {
            end: self.start + max_len - 1,
            ..self
        }
    }

    /// `Content-Range` header value, e.g. `bytes 0-499/500`.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.size)
    }
}

/// `Content-Range` value for a 416 response, e.g. `bytes */500`.
pub fn unsatisfied_content_range(size: u64) -> String {
    format!("bytes */{size}")
}

/// Why a `Range` header could not be turned into a [`ByteRange`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    /// The header is syntactically invalid. Maps to 400.
    #[error("malformed Range header: {0}")]
    Malformed(String),
    /// The range starts at or beyond the end of the resource. Maps to 416.
    #[error("range not satisfiable for resource of {size} bytes")]
    Unsatisfiable { size: u64 },
}

impl From<RangeError> for Error {
    fn from(err: RangeError) -> Self {
        match err {
            RangeError::Malformed(reason) => Error::Validation(format!("malformed Range header: {reason}")),
            RangeError::Unsatisfiable { size } => Error::RangeNotSatisfiable { size },
        }
    }
}

/// Resolve an optional `Range` header value against a resource of `size`
/// bytes.
pub fn resolve(header: Option<&str>, size: u64, policy: &RangePolicy) -> Result<ByteRange, RangeError> {
    let header = header.map(str::trim).filter(|h| !h.is_empty());

    let Some(header) = header else {
        if size == 0 {
            return Err(RangeError::Unsatisfiable { size });
        }
        let window = policy.default_window.max(1).min(size);
        return Ok(ByteRange {
            start: 0,
            end: window - 1,
            size,
        });
    };

    let (start, end) = parse(header)?;

    if start >= size {
        return Err(RangeError::Unsatisfiable { size });
    }

    let end = end
        .unwrap_or_else(|| start.saturating_add(policy.open_end_cap.max(1) - 1))
        .min(size - 1);

    Ok(ByteRange { start, end, size })
}

/// Split `bytes=START-END` into its numbers without looking at the size.
fn parse(header: &str) -> Result<(u64, Option<u64>), RangeError> {
    let range_set = header
        .strip_prefix("bytes=")
        .ok_or_else(|| RangeError::Malformed("expected 'bytes=' unit".into()))?;

    if range_set.contains(',') {
        return Err(RangeError::Malformed("multiple ranges are not supported".into()));
    }

    let (start_str, end_str) = range_set
        .split_once('-')
        .ok_or_else(|| RangeError::Malformed("missing '-' separator".into()))?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    if start_str.is_empty() {
        return Err(RangeError::Malformed("range start is required".into()));
    }
    let start: u64 = start_str
        .parse()
        .map_err(|_| RangeError::Malformed(format!("invalid range start '{start_str}'")))?;

    let end = if end_str.is_empty() {
        None
    } else {
        let end: u64 = end_str
            .parse()
            .map_err(|_| RangeError::Malformed(format!("invalid range end '{end_str}'")))?;
        if end < start {
            return Err(RangeError::Malformed(format!("range end {end} precedes start {start}")));
        }
        Some(end)
    };

    Ok((start, end))
}
