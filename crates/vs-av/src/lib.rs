//! # vs-av
//!
//! External tool plumbing for the transcode pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache the path to
//!   ffmpeg, honoring a configured override.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support; the child is killed if the caller stops waiting.
//! - **Action functions** ([`actions`]) -- single-file MP4 conversion and
//!   adaptive HLS encoding with a master playlist.

pub mod actions;
pub mod command;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use tools::{ToolInfo, ToolRegistry};

pub use actions::{convert_to_mp4, encode_adaptive_hls, HlsOutput, MASTER_PLAYLIST};
