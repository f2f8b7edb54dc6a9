use async_trait::async_trait;
use redis::AsyncCommands;
use serde::Serialize;
use uuid::Uuid;

use crate::infrastructure::redis::client::RedisService;
use crate::modules::transcode::error::TranscodeError;
use crate::modules::transcode::model::RenditionTag;

/// Events the live-update collaborator subscribes to, one channel per job.
/// Ordering is guaranteed within a job only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Queued { content_id: String },
    StepStarted { step: u32, total: u32, detail: String },
    RenditionReady { tag: RenditionTag },
    Packaging,
    Uploading { artifacts: u32 },
    Completed { manifest_location: String },
    Failed { reason: String },
}

#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn publish(&self, channel: &str, event: &ProgressEvent) -> Result<(), TranscodeError>;
}

pub fn channel_for(job_id: Uuid) -> String {
    format!("transcode:progress:{}", job_id)
}

pub struct RedisProgress {
    redis: RedisService,
}

impl RedisProgress {
    pub fn new(redis: RedisService) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl ProgressSink for RedisProgress {
    async fn publish(&self, channel: &str, event: &ProgressEvent) -> Result<(), TranscodeError> {
        let payload = serde_json::to_string(event)?;
        let mut conn = self.redis.get_conn().await?;
        let _: () = conn.publish(channel, payload).await?;
        Ok(())
    }
}
