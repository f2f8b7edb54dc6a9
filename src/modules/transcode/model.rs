use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::media::probe::SourceInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Stalled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Stalled => "stalled",
        }
    }
}

/// One unit of work on the durable queue. Created by intake, advanced only by
/// the worker that owns it, retried or failed only by the health monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub owner: String,
    pub source_path: PathBuf,
    pub content_id: String,
    pub source: SourceInfo,
    pub include_audio: bool,
    pub step_index: u32,
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub deadline: OffsetDateTime,
    pub progress_channel: String,
    pub status: JobStatus,
    pub updated_at: OffsetDateTime,
}

impl Job {
    pub fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }
}

/// Identifies one output artifact of a job: a ladder rung, the audio track,
/// or the manifest itself. Artifacts are addressed by tag, never by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenditionTag {
    Video { height: u32 },
    Audio { codec: String },
    Manifest,
}

impl RenditionTag {
    /// File name the artifact is stored under, locally and in object storage.
    pub fn file_name(&self) -> String {
        match self {
            RenditionTag::Video { height } => format!("{}p.mp4", height),
            RenditionTag::Audio { codec } => format!("audio_{}.mp4", codec),
            RenditionTag::Manifest => "manifest.mpd".to_string(),
        }
    }
}

impl fmt::Display for RenditionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenditionTag::Video { height } => write!(f, "{}p", height),
            RenditionTag::Audio { codec } => write!(f, "audio/{}", codec),
            RenditionTag::Manifest => write!(f, "manifest"),
        }
    }
}

pub fn object_key(content_id: &str, tag: &RenditionTag) -> String {
    format!("vod/{}/{}", content_id, tag.file_name())
}

pub fn manifest_key(content_id: &str) -> String {
    object_key(content_id, &RenditionTag::Manifest)
}

/// A produced local artifact, owned exclusively by its job.
#[derive(Debug, Clone)]
pub struct Rendition {
    pub local_path: PathBuf,
    pub tag: RenditionTag,
}

/// A confirmed remote copy of a rendition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedArtifact {
    pub location: String,
    pub tag: RenditionTag,
}

/// Per-content lifecycle state, mirrored onto the owner's listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ContentState {
    Processing { since: OffsetDateTime },
    AwaitingInfo { since: OffsetDateTime },
    Published,
}

impl ContentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentState::Processing { .. } => "processing",
            ContentState::AwaitingInfo { .. } => "awaiting_info",
            ContentState::Published => "published",
        }
    }

    pub fn since(&self) -> Option<OffsetDateTime> {
        match self {
            ContentState::Processing { since } | ContentState::AwaitingInfo { since } => {
                Some(*since)
            }
            ContentState::Published => None,
        }
    }

    pub fn from_column(state: &str, since: OffsetDateTime) -> Self {
        match state {
            "awaiting_info" => ContentState::AwaitingInfo { since },
            "published" => ContentState::Published,
            _ => ContentState::Processing { since },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentRecord {
    pub content_id: String,
    pub owner_username: String,
    pub title: Option<String>,
    pub manifest_location: Option<String>,
    pub rendition_locations: Vec<UploadedArtifact>,
    pub state: ContentState,
    pub created_at: OffsetDateTime,
}

/// The one mutation the finalizer applies to a ContentRecord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUpdate {
    pub manifest_location: String,
    pub rendition_locations: Vec<UploadedArtifact>,
    pub state: ContentState,
}
