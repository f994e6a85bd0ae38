//! MIME types for stored videos and segmented-stream assets.

/// Guess the MIME type of a stored video from its extension.
pub fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

    match ext.to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "ts" => "video/mp2t",
        _ => "application/octet-stream",
    }
}

/// MIME type for a file under a segmented asset directory, by suffix.
///
/// Returns `None` for suffixes that are not part of an HLS rendition so the
/// caller can decide how to label them.
pub fn hls_content_type(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.').map(|(_, ext)| ext)?;

    match ext.to_ascii_lowercase().as_str() {
        "m3u8" => Some("application/vnd.apple.mpegurl"),
        "ts" => Some("video/mp2t"),
        "fmp4" | "m4s" => Some("video/iso.segment"),
        "mp4" => Some("video/mp4"),
        _ => None,
    }
}
