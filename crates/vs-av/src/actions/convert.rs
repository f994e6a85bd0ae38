//! Single-file H.264/AAC MP4 conversion using ffmpeg.

use std::path::Path;
use std::time::Duration;

use vs_core::config::TranscodeConfig;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// ffmpeg arguments for a progressive MP4 conversion.
///
/// `-y -i IN -c:v libx264 -crf C -preset P -c:a aac -b:a A -movflags +faststart OUT`
pub fn convert_args(input: &Path, output: &Path, config: &TranscodeConfig) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into(), "-i".into()];
    args.push(input.to_string_lossy().into_owned());
    args.extend(
        [
            "-c:v",
            "libx264",
            "-crf",
            config.video_crf.to_string().as_str(),
            "-preset",
            config.video_preset.as_str(),
            "-c:a",
            "aac",
            "-b:a",
            config.audio_bitrate.as_str(),
            "-movflags",
            "+faststart",
        ]
        .map(String::from),
    );
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Convert `input` into a faststart MP4 at `output`.
///
/// Any launch failure, non-zero exit or timeout is an error; the caller owns
/// cleanup of both paths.
pub async fn convert_to_mp4(
    tools: &ToolRegistry,
    input: &Path,
    output: &Path,
    config: &TranscodeConfig,
) -> vs_core::Result<()> {
    let ffmpeg = tools.require("ffmpeg")?;

    tracing::info!(
        "MP4 encode: {:?} -> {:?} (crf={}, preset={})",
        input,
        output,
        config.video_crf,
        config.video_preset,
    );

    let mut cmd = ToolCommand::new(ffmpeg.path.clone());
    cmd.timeout(Duration::from_secs(config.timeout_secs));
    cmd.args(convert_args(input, output, config));
    cmd.execute().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn default_args_are_pinned() {
        let args = convert_args(
            Path::new("/up/.incoming/in.avi"),
            Path::new("/up/out.mp4"),
            &TranscodeConfig::default(),
        );
        assert_eq!(
            args,
            [
                "-y",
                "-i",
                "/up/.incoming/in.avi",
                "-c:v",
                "libx264",
                "-crf",
                "23",
                "-preset",
                "fast",
                "-c:a",
                "aac",
                "-b:a",
                "128k",
                "-movflags",
                "+faststart",
                "/up/out.mp4",
            ]
        );
    }

    #[test]
    fn args_follow_config() {
        let config = TranscodeConfig {
            video_crf: 28,
            video_preset: "veryfast".into(),
            audio_bitrate: "96k".into(),
            ..TranscodeConfig::default()
        };
        let args = convert_args(Path::new("a"), Path::new("b"), &config);
        assert!(args.windows(2).any(|w| w == ["-crf", "28"]));
        assert!(args.windows(2).any(|w| w == ["-preset", "veryfast"]));
        assert!(args.windows(2).any(|w| w == ["-b:a", "96k"]));
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_tool_error() {
        let err = convert_to_mp4(
            &ToolRegistry::default(),
            &PathBuf::from("in.mp4"),
            &PathBuf::from("out.mp4"),
            &TranscodeConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, vs_core::Error::Tool { .. }));
    }
}
