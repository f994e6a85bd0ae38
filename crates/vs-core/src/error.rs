//! Unified error type for vidstream.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in vidstream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "video", "file").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation (missing parameter, bad extension,
    /// malformed `Range` header).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested byte range starts beyond the end of the resource.
    #[error("Range not satisfiable (resource size {size})")]
    RangeNotSatisfiable {
        /// Size of the resource the range was checked against.
        size: u64,
    },

    /// The target exists but may not be served (e.g. a directory).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A conflicting resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg) could not be launched or returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// A transcode job finished without producing a playable artifact.
    #[error("Transcode failed: {0}")]
    Transcode(String),

    /// The metadata store and the filesystem have diverged and cannot be
    /// reconciled automatically.
    #[error("Inconsistent state (manual intervention required): {0}")]
    Inconsistency(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::RangeNotSatisfiable { .. } => 416,
            Error::Forbidden(_) => 403,
            Error::Conflict(_) => 409,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Tool { .. } => 500,
            Error::Transcode(_) => 500,
            Error::Inconsistency(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Whether recovering from this error needs an operator.
    pub fn requires_manual_intervention(&self) -> bool {
        matches!(self, Error::Inconsistency(_))
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("video", "abc.mp4");
        assert_eq!(err.to_string(), "video not found: abc.mp4");
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("file_name is required".into());
        assert_eq!(err.to_string(), "Validation error: file_name is required");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn range_not_satisfiable_is_416() {
        let err = Error::RangeNotSatisfiable { size: 500 };
        assert_eq!(err.http_status(), 416);
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn conflict_display() {
        let err = Error::Conflict("file_name already exists".into());
        assert_eq!(err.http_status(), 409);
    }

    #[test]
    fn forbidden_is_403() {
        assert_eq!(Error::Forbidden("not a file".into()).http_status(), 403);
    }

    #[test]
    fn database_display() {
        let err = Error::database("connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("ffmpeg", "exit code 1");
        assert_eq!(err.to_string(), "Tool error [ffmpeg]: exit code 1");
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn only_inconsistency_needs_an_operator() {
        assert!(Error::Inconsistency("record survived".into()).requires_manual_intervention());
        assert!(!Error::Internal("boom".into()).requires_manual_intervention());
        assert!(!Error::database("locked").requires_manual_intervention());
    }

    #[test]
    fn inconsistency_display_mentions_intervention() {
        let err = Error::Inconsistency("x.mp4".into());
        assert!(err.to_string().contains("manual intervention required"));
        assert_eq!(err.http_status(), 500);
    }
}
