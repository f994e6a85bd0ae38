//! HLS master playlist generation.
//!
//! The segmented transcode writes one media playlist per quality tier with
//! ffmpeg, then a master playlist (`main.m3u8`) built here that lists every
//! tier that encoded successfully.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// A stream variant in a master playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Peak bandwidth in bits per second.
    pub bandwidth: u64,
    /// Resolution as `WIDTHxHEIGHT`, written verbatim when present.
    pub resolution: Option<String>,
    /// Codec string (e.g. `avc1.42e01e,mp4a.40.2`); omitted when empty.
    pub codecs: String,
    /// URI of the variant's media playlist, relative to the master.
    pub uri: String,
}

/// An HLS master playlist containing one entry per encoded tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterPlaylist {
    pub variants: Vec<Variant>,
}

/// Render a [`MasterPlaylist`] as M3U8 text.
pub fn generate_master_playlist(playlist: &MasterPlaylist) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "#EXTM3U");
    let _ = writeln!(out, "#EXT-X-VERSION:3");

    for variant in &playlist.variants {
        let _ = write!(out, "#EXT-X-STREAM-INF:BANDWIDTH={}", variant.bandwidth);
        if let Some(resolution) = &variant.resolution {
            let _ = write!(out, ",RESOLUTION={resolution}");
        }
        if !variant.codecs.is_empty() {
            let _ = write!(out, ",CODECS=\"{}\"", variant.codecs);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", variant.uri);
    }

    out
}

/// Parse an ffmpeg-style bitrate (`1M`, `96k`, `2.5M`, `128000`) into bits
/// per second. Suffixes are decimal (`k` = 1000).
pub fn parse_bitrate_to_bps(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (number, multiplier) = match s.as_bytes()[s.len() - 1] {
        b'k' | b'K' => (&s[..s.len() - 1], 1_000.0),
        b'm' | b'M' => (&s[..s.len() - 1], 1_000_000.0),
        b'g' | b'G' => (&s[..s.len() - 1], 1_000_000_000.0),
        _ => (s, 1.0),
    };

    let value: f64 = number.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier).round() as u64)
}
