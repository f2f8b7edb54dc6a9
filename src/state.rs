use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::db::pool::DbPool;
use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::infrastructure::redis::client::RedisService;
use crate::infrastructure::storage::s3::StorageService;
use crate::media::encoder::FfmpegEncoder;
use crate::media::packager::ShakaPackager;
use crate::media::probe::FfprobeProber;
use crate::modules::transcode::content_store::PgContentStore;
use crate::modules::transcode::job_store::RedisJobStore;
use crate::modules::transcode::progress::RedisProgress;
use crate::modules::transcode::service::{TranscodeService, TranscodeTuning};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub redis: RedisService,
    pub storage: StorageService,
    pub queue: RabbitMqService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: DbPool,
        redis: RedisService,
        storage: StorageService,
        queue: RabbitMqService,
    ) -> Self {
        Self {
            config,
            db,
            redis,
            storage,
            queue,
        }
    }

    /// Wires the pipeline over the live infrastructure handles. Cheap enough
    /// to call per worker; everything inside is an Arc over a shared handle.
    pub fn transcoder(&self) -> TranscodeService {
        TranscodeService {
            tuning: TranscodeTuning::from_config(&self.config),
            prober: Arc::new(FfprobeProber),
            encoder: Arc::new(FfmpegEncoder),
            packager: Arc::new(ShakaPackager::default()),
            object_store: Arc::new(self.storage.clone()),
            job_store: Arc::new(RedisJobStore::new(self.redis.clone())),
            content_store: Arc::new(PgContentStore::new(self.db.clone())),
            queue: Arc::new(self.queue.clone()),
            progress: Arc::new(RedisProgress::new(self.redis.clone())),
        }
    }
}
