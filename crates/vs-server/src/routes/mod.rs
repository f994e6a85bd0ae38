//! Route handlers for the HTTP API.

pub mod health;
pub mod hls;
pub mod stream;
pub mod videos;

use serde::Deserialize;

/// `?file_name=` query shared by the stream and delete endpoints.
#[derive(Debug, Deserialize)]
pub struct FileNameQuery {
    pub file_name: Option<String>,
}

impl FileNameQuery {
    /// The parameter, or a validation error naming it.
    pub fn require(self) -> vs_core::Result<String> {
        match self.file_name {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(vs_core::Error::Validation(
                "Missing required parameter: file_name".into(),
            )),
        }
    }
}
