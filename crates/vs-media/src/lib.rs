//! vs-media: byte-range resolution, file slicing, content types and HLS
//! master playlists.
//!
//! Everything here is synchronous and free of HTTP types so it can be unit
//! tested and benchmarked in isolation.
//!
//! # Modules
//!
//! - [`range`] - Resolve a `Range` header against a resource size
//! - [`slice`] - Read exactly the bytes of a resolved range from disk
//! - [`content_type`] - MIME types for stored videos and HLS assets
//! - [`hls`] - Master playlist rendering and bitrate parsing

pub mod content_type;
pub mod hls;
pub mod range;
pub mod slice;

// Re-export commonly used items at the crate root.
pub use content_type::{guess_content_type, hls_content_type};
pub use hls::{generate_master_playlist, parse_bitrate_to_bps, MasterPlaylist, Variant};
pub use range::{resolve, unsatisfied_content_range, ByteRange, RangeError, RangePolicy};
pub use slice::{read_slice, Slice};
