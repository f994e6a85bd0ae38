//! Transcode actions: single-file MP4 conversion and adaptive HLS.

mod convert;
mod hls;

pub use convert::{convert_args, convert_to_mp4};
pub use hls::{encode_adaptive_hls, hls_tier_args, HlsOutput, MASTER_PLAYLIST};
