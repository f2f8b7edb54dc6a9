use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;

use crate::modules::transcode::error::TranscodeError;

/// What intake needs to know about an uploaded file before committing to a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Container token list as reported by the prober, e.g. "mov,mp4,m4a,3gp,3g2,mj2".
    pub container: String,
    pub height: u32,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    /// Some muxers report zero channels; the audio step forces stereo then.
    pub audio_channels: Option<u32>,
}

#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<SourceInfo, TranscodeError>;
}

/// ffprobe invocation with JSON output.
#[derive(Debug, Default)]
pub struct FfprobeProber;

#[derive(Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    height: Option<u32>,
    channels: Option<u32>,
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<SourceInfo, TranscodeError> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| TranscodeError::Probe(format!("failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(TranscodeError::Probe(format!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| TranscodeError::Probe(format!("unreadable ffprobe output: {}", e)))?;

        let container = parsed
            .format
            .and_then(|f| f.format_name)
            .ok_or_else(|| TranscodeError::Probe("no container format reported".to_string()))?;

        let video = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| TranscodeError::Probe("no video stream found".to_string()))?;

        let height = video
            .height
            .ok_or_else(|| TranscodeError::Probe("video stream has no height".to_string()))?;

        let audio = parsed
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"));

        Ok(SourceInfo {
            container,
            height,
            video_codec: video.codec_name.clone(),
            audio_codec: audio.and_then(|s| s.codec_name.clone()),
            audio_channels: audio.and_then(|s| s.channels),
        })
    }
}
