use crate::config::env::{self, EnvKey};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: String,
    pub amqp_url: String,
    pub minio_url: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub scratch_dir: String,
    pub worker_slots: usize,
    pub max_attempts: u32,
    pub job_timeout_secs: u64,
    pub stall_window_secs: u64,
    pub monitor_interval_secs: u64,
    pub purge_interval_secs: u64,
    pub completion_grace_ms: u64,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        Ok(Self {
            database_url: env::get(EnvKey::DatabaseUrl)?,
            redis_url: env::get(EnvKey::RedisUrl)?,
            amqp_url: env::get(EnvKey::AmqpUrl)?,
            minio_url: env::get(EnvKey::MinioUrl)?,
            minio_bucket: env::get(EnvKey::MinioBucket)?,
            minio_access_key: env::get(EnvKey::MinioAccessKey)?,
            minio_secret_key: env::get(EnvKey::MinioSecretKey)?,
            scratch_dir: env::get_or(EnvKey::ScratchDir, "/tmp/transcode"),
            worker_slots: env::get_parsed(EnvKey::WorkerSlots, num_cpus::get()),
            max_attempts: env::get_parsed(EnvKey::MaxAttempts, 2),
            job_timeout_secs: env::get_parsed(EnvKey::JobTimeoutSecs, 3600),
            stall_window_secs: env::get_parsed(EnvKey::StallWindowSecs, 120),
            monitor_interval_secs: env::get_parsed(EnvKey::MonitorIntervalSecs, 30),
            purge_interval_secs: env::get_parsed(EnvKey::PurgeIntervalSecs, 300),
            completion_grace_ms: env::get_parsed(EnvKey::CompletionGraceMs, 1500),
        })
    }
}
