use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::modules::transcode::error::TranscodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
    Text,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
            StreamKind::Text => "text",
        }
    }
}

/// One `in=..,stream=..,output=..` descriptor for the packager.
#[derive(Debug, Clone)]
pub struct PackagerInput {
    pub input: PathBuf,
    pub kind: StreamKind,
    pub output: PathBuf,
}

/// External packager: one invocation per job, all renditions at once, plus the
/// manifest output path. Success is the exit status; the caller verifies the
/// manifest landed on disk.
#[async_trait]
pub trait Packager: Send + Sync {
    async fn package(
        &self,
        inputs: &[PackagerInput],
        manifest_output: &Path,
    ) -> Result<(), TranscodeError>;
}

pub struct ShakaPackager {
    binary: String,
}

impl Default for ShakaPackager {
    fn default() -> Self {
        Self {
            binary: "packager".to_string(),
        }
    }
}

#[async_trait]
impl Packager for ShakaPackager {
    async fn package(
        &self,
        inputs: &[PackagerInput],
        manifest_output: &Path,
    ) -> Result<(), TranscodeError> {
        let mut cmd = Command::new(&self.binary);

        for input in inputs {
            cmd.arg(format!(
                "in={},stream={},output={}",
                input.input.display(),
                input.kind.as_str(),
                input.output.display()
            ));
        }

        cmd.arg("--mpd_output").arg(manifest_output);

        debug!("packaging {} streams into {:?}", inputs.len(), manifest_output);

        let output = cmd
            .output()
            .await
            .map_err(|e| TranscodeError::Packaging(format!("failed to run packager: {}", e)))?;

        if !output.status.success() {
            return Err(TranscodeError::Packaging(format!(
                "packager exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}
