use async_trait::async_trait;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::infrastructure::redis::client::RedisService;
use crate::modules::transcode::error::TranscodeError;
use crate::modules::transcode::model::Job;

/// Durable job bookkeeping. The queue carries deliveries; this store carries
/// the authoritative record the worker and the health monitor agree on.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: &Job) -> Result<(), TranscodeError>;
    async fn save(&self, job: &Job) -> Result<(), TranscodeError>;
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, TranscodeError>;
    /// The intake dedup check: at most one non-terminal job per owner.
    async fn active_for_owner(&self, owner: &str) -> Result<Option<Job>, TranscodeError>;
    async fn all(&self) -> Result<Vec<Job>, TranscodeError>;
    async fn remove(&self, job_id: Uuid) -> Result<(), TranscodeError>;
}

pub struct RedisJobStore {
    redis: RedisService,
}

impl RedisJobStore {
    pub fn new(redis: RedisService) -> Self {
        Self { redis }
    }

    fn job_key(job_id: Uuid) -> String {
        format!("transcode:job:{}", job_id)
    }

    fn owner_key(owner: &str) -> String {
        format!("transcode:owner:{}", owner)
    }

    const INDEX_KEY: &'static str = "transcode:jobs";
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn create(&self, job: &Job) -> Result<(), TranscodeError> {
        let payload = serde_json::to_string(job)?;
        let mut conn = self.redis.get_conn().await?;

        let _: () = conn.set(Self::job_key(job.job_id), payload).await?;
        let _: () = conn.sadd(Self::INDEX_KEY, job.job_id.to_string()).await?;
        let _: () = conn
            .set(Self::owner_key(&job.owner), job.job_id.to_string())
            .await?;

        Ok(())
    }

    async fn save(&self, job: &Job) -> Result<(), TranscodeError> {
        let payload = serde_json::to_string(job)?;
        let mut conn = self.redis.get_conn().await?;
        let _: () = conn.set(Self::job_key(job.job_id), payload).await?;
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, TranscodeError> {
        let mut conn = self.redis.get_conn().await?;
        let raw: Option<String> = conn.get(Self::job_key(job_id)).await?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn active_for_owner(&self, owner: &str) -> Result<Option<Job>, TranscodeError> {
        let mut conn = self.redis.get_conn().await?;
        let job_id: Option<String> = conn.get(Self::owner_key(owner)).await?;

        let Some(job_id) = job_id else {
            return Ok(None);
        };
        let Ok(job_id) = job_id.parse::<Uuid>() else {
            return Ok(None);
        };

        match self.get(job_id).await? {
            Some(job) if !job.status.is_terminal() => Ok(Some(job)),
            _ => Ok(None),
        }
    }

    async fn all(&self) -> Result<Vec<Job>, TranscodeError> {
        let mut conn = self.redis.get_conn().await?;
        let ids: Vec<String> = conn.smembers(Self::INDEX_KEY).await?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            let Ok(job_id) = id.parse::<Uuid>() else {
                continue;
            };
            if let Some(job) = self.get(job_id).await? {
                jobs.push(job);
            }
        }

        Ok(jobs)
    }

    async fn remove(&self, job_id: Uuid) -> Result<(), TranscodeError> {
        let mut conn = self.redis.get_conn().await?;

        // Drop the owner pointer only if it still points at this job.
        if let Some(job) = self.get(job_id).await? {
            let current: Option<String> = conn.get(Self::owner_key(&job.owner)).await?;
            if current.as_deref() == Some(&job_id.to_string()) {
                let _: () = conn.del(Self::owner_key(&job.owner)).await?;
            }
        }

        let _: () = conn.del(Self::job_key(job_id)).await?;
        let _: () = conn.srem(Self::INDEX_KEY, job_id.to_string()).await?;

        Ok(())
    }
}
