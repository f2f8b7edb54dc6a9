use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use crate::modules::transcode::error::TranscodeError;
use crate::modules::transcode::ladder::{
    KEYFRAME_INTERVAL_FRAMES, TARGET_AUDIO_BITRATE_KBPS, TARGET_AUDIO_CODEC,
};

#[derive(Debug, Clone)]
pub struct AudioEncodeSpec {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Set when the probe reported zero or missing channels.
    pub force_stereo: bool,
}

#[derive(Debug, Clone)]
pub struct VideoEncodeSpec {
    pub source: PathBuf,
    pub output: PathBuf,
    pub height: u32,
    pub bitrate_kbps: u32,
    pub preset: &'static str,
}

/// External encoder invoked once per rendition, judged by its exit status.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode_audio(&self, spec: &AudioEncodeSpec) -> Result<(), TranscodeError>;
    async fn encode_video(&self, spec: &VideoEncodeSpec) -> Result<(), TranscodeError>;
}

#[derive(Debug, Default)]
pub struct FfmpegEncoder;

impl FfmpegEncoder {
    async fn run(mut cmd: Command, what: &str) -> Result<(), TranscodeError> {
        let output = cmd
            .output()
            .await
            .map_err(|e| TranscodeError::Encoding(format!("failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(TranscodeError::Encoding(format!(
                "{} exited with {}: {}",
                what,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode_audio(&self, spec: &AudioEncodeSpec) -> Result<(), TranscodeError> {
        debug!("encoding audio track from {:?}", spec.source);

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error"])
            .arg("-i")
            .arg(&spec.source)
            .args(["-vn", "-c:a", TARGET_AUDIO_CODEC])
            .args(["-b:a", &format!("{}k", TARGET_AUDIO_BITRATE_KBPS)]);

        if spec.force_stereo {
            cmd.args(["-ac", "2"]);
        }

        cmd.arg("-y").arg(&spec.output);

        Self::run(cmd, "audio encode").await
    }

    async fn encode_video(&self, spec: &VideoEncodeSpec) -> Result<(), TranscodeError> {
        debug!("encoding {}p rendition from {:?}", spec.height, spec.source);

        let gop = KEYFRAME_INTERVAL_FRAMES.to_string();

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error"])
            .arg("-i")
            .arg(&spec.source)
            // Audio travels only in the dedicated audio rendition.
            .args(["-an", "-c:v", "libx264"])
            .args(["-preset", spec.preset])
            .args(["-b:v", &format!("{}k", spec.bitrate_kbps)])
            // -2 keeps the width even while preserving aspect ratio.
            .args(["-vf", &format!("scale=-2:{}", spec.height)])
            .args(["-g", &gop, "-keyint_min", &gop, "-sc_threshold", "0"])
            .args(["-movflags", "+faststart"])
            .arg("-y")
            .arg(&spec.output);

        Self::run(cmd, "video encode").await
    }
}
