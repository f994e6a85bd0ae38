//! Adaptive HLS encoding: one ffmpeg run per quality tier plus a master
//! playlist listing the tiers that succeeded.

use std::path::Path;
use std::time::Duration;

use vs_core::config::{QualityTier, TranscodeConfig};
use vs_core::Error;
use vs_media::hls::{generate_master_playlist, parse_bitrate_to_bps, MasterPlaylist, Variant};

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// File name of the master playlist inside an asset directory.
pub const MASTER_PLAYLIST: &str = "main.m3u8";

/// Codecs advertised for every tier (H.264 baseline + AAC-LC).
const TIER_CODECS: &str = "avc1.42e01e,mp4a.40.2";

/// Result of a segmented encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsOutput {
    /// Names of the tiers that encoded successfully, in config order.
    pub tiers: Vec<String>,
}

/// ffmpeg arguments for one tier: `DIR/<tier>.m3u8` plus
/// `DIR/<tier>_%03d.ts` segments.
pub fn hls_tier_args(
    input: &Path,
    output_dir: &Path,
    tier: &QualityTier,
    config: &TranscodeConfig,
) -> Vec<String> {
    let playlist = output_dir.join(format!("{}.m3u8", tier.name));
    let segments = output_dir.join(format!("{}_%03d.ts", tier.name));

    let mut args: Vec<String> = vec!["-y".into(), "-i".into()];
    args.push(input.to_string_lossy().into_owned());
    args.extend(
        [
            "-c:v",
            "libx264",
            "-b:v",
            tier.video_bitrate.as_str(),
            "-preset",
            config.video_preset.as_str(),
            "-vf",
            format!("scale={}", tier.resolution.replace('x', ":")).as_str(),
            "-c:a",
            "aac",
            "-b:a",
            tier.audio_bitrate.as_str(),
            "-f",
            "hls",
            "-hls_list_size",
            "0",
            "-hls_flags",
            "temp_file",
            "-hls_time",
            config.segment_duration_secs.to_string().as_str(),
            "-hls_playlist_type",
            "vod",
            "-hls_segment_filename",
        ]
        .map(String::from),
    );
    args.push(segments.to_string_lossy().into_owned());
    args.push(playlist.to_string_lossy().into_owned());
    args
}

/// Encode every configured tier into `output_dir` and write
/// [`MASTER_PLAYLIST`].
///
/// A failing tier is logged and skipped, and whatever it wrote is removed
/// again. If no tier succeeds, or the master
/// playlist cannot be written, `output_dir` is removed and an
/// [`Error::Transcode`] is returned.
pub async fn encode_adaptive_hls(
    tools: &ToolRegistry,
    input: &Path,
    output_dir: &Path,
    config: &TranscodeConfig,
) -> vs_core::Result<HlsOutput> {
    let ffmpeg = tools.require("ffmpeg")?;

    tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
        Error::Internal(format!(
            "Failed to create HLS output dir {}: {e}",
            output_dir.display()
        ))
    })?;

    let mut master = MasterPlaylist::default();
    let mut encoded = Vec::new();

    for tier in &config.tiers {
        tracing::info!(
            "HLS encode: {:?} -> {:?} (tier={}, resolution={}, segment={}s)",
            input,
            output_dir,
            tier.name,
            tier.resolution,
            config.segment_duration_secs,
        );

        let mut cmd = ToolCommand::new(ffmpeg.path.clone());
        cmd.timeout(Duration::from_secs(config.timeout_secs));
        cmd.args(hls_tier_args(input, output_dir, tier, config));

        if let Err(e) = cmd.execute().await {
            tracing::warn!(tier = %tier.name, "HLS tier failed: {e}");
            discard_tier(output_dir, &tier.name).await;
            continue;
        }

        master.variants.push(variant_for(tier));
        encoded.push(tier.name.clone());
    }

    if encoded.is_empty() {
        purge(output_dir).await;
        return Err(Error::Transcode(format!(
            "no quality tier encoded successfully ({} attempted)",
            config.tiers.len()
        )));
    }

    let master_path = output_dir.join(MASTER_PLAYLIST);
    if let Err(e) = tokio::fs::write(&master_path, generate_master_playlist(&master)).await {
        purge(output_dir).await;
        return Err(Error::Transcode(format!(
            "failed to write master playlist {}: {e}",
            master_path.display()
        )));
    }

    Ok(HlsOutput { tiers: encoded })
}

fn variant_for(tier: &QualityTier) -> Variant {
    let bps = |s: &str| {
        parse_bitrate_to_bps(s).unwrap_or_else(|| {
            tracing::warn!(tier = %tier.name, "Unparseable bitrate '{s}'; counting as 0");
            0
        })
    };

    Variant {
        bandwidth: bps(&tier.video_bitrate) + bps(&tier.audio_bitrate),
        resolution: Some(tier.resolution.clone()),
        codecs: TIER_CODECS.to_string(),
        uri: format!("{}.m3u8", tier.name),
    }
}

/// Remove the playlist and segments (including ffmpeg temp files) of one
/// tier from `dir`.
async fn discard_tier(dir: &Path, tier: &str) {
    let playlist = format!("{tier}.m3u8");
    let segment_prefix = format!("{tier}_");

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(tier, "Cannot list HLS output {}: {e}", dir.display());
            return;
        }
    };
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(tier, "Cannot list HLS output {}: {e}", dir.display());
                break;
            }
        };
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !(name.starts_with(&playlist) || name.starts_with(&segment_prefix)) {
            continue;
        }
        if let Err(e) = tokio::fs::remove_file(entry.path()).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::error!(tier, "Failed to remove {}: {e}", entry.path().display());
            }
        }
    }
}

async fn purge(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::error!("Failed to purge HLS output {}: {e}", dir.display());
        }
    }
}
