use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::settings::AppConfig;
use crate::infrastructure::storage::s3::ObjectStore;
use crate::media::encoder::Encoder;
use crate::media::packager::Packager;
use crate::media::probe::MediaProber;
use crate::modules::transcode::content_store::ContentStore;
use crate::modules::transcode::error::TranscodeError;
use crate::modules::transcode::job_store::JobStore;
use crate::modules::transcode::model::Job;
use crate::modules::transcode::progress::ProgressSink;

/// Hands a job to the durable queue for some worker to pick up.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: &Job) -> Result<(), TranscodeError>;
}

/// Pipeline tunables, all overridable through the environment.
#[derive(Debug, Clone)]
pub struct TranscodeTuning {
    pub scratch_dir: PathBuf,
    pub worker_slots: usize,
    pub max_attempts: u32,
    pub job_timeout_secs: u64,
    pub stall_window_secs: u64,
    pub monitor_interval_secs: u64,
    pub purge_interval_secs: u64,
    pub completion_grace_ms: u64,
}

impl TranscodeTuning {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            scratch_dir: PathBuf::from(&config.scratch_dir),
            worker_slots: config.worker_slots,
            max_attempts: config.max_attempts,
            job_timeout_secs: config.job_timeout_secs,
            stall_window_secs: config.stall_window_secs,
            monitor_interval_secs: config.monitor_interval_secs,
            purge_interval_secs: config.purge_interval_secs,
            completion_grace_ms: config.completion_grace_ms,
        }
    }

    pub fn job_timeout(&self) -> time::Duration {
        time::Duration::seconds(self.job_timeout_secs as i64)
    }

    pub fn stall_window(&self) -> time::Duration {
        time::Duration::seconds(self.stall_window_secs as i64)
    }

    pub fn completion_grace(&self) -> Duration {
        Duration::from_millis(self.completion_grace_ms)
    }
}

/// All collaborators the pipeline needs, constructed once at process start and
/// injected everywhere (no module-level singletons).
#[derive(Clone)]
pub struct TranscodeService {
    pub tuning: TranscodeTuning,
    pub prober: Arc<dyn MediaProber>,
    pub encoder: Arc<dyn Encoder>,
    pub packager: Arc<dyn Packager>,
    pub object_store: Arc<dyn ObjectStore>,
    pub job_store: Arc<dyn JobStore>,
    pub content_store: Arc<dyn ContentStore>,
    pub queue: Arc<dyn JobQueue>,
    pub progress: Arc<dyn ProgressSink>,
}
