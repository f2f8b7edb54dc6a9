use std::env;
use std::str::FromStr;

pub enum EnvKey {
    DatabaseUrl,
    RedisUrl,
    AmqpUrl,
    MinioUrl,
    MinioBucket,
    MinioAccessKey,
    MinioSecretKey,
    ScratchDir,
    WorkerSlots,
    MaxAttempts,
    JobTimeoutSecs,
    StallWindowSecs,
    MonitorIntervalSecs,
    PurgeIntervalSecs,
    CompletionGraceMs,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::RedisUrl => "REDIS_URL",
            EnvKey::AmqpUrl => "AMQP_URL",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::MinioBucket => "MINIO_BUCKET_VIDEOS",
            EnvKey::MinioAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::MinioSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::ScratchDir => "TRANSCODE_SCRATCH_DIR",
            EnvKey::WorkerSlots => "TRANSCODE_WORKER_SLOTS",
            EnvKey::MaxAttempts => "TRANSCODE_MAX_ATTEMPTS",
            EnvKey::JobTimeoutSecs => "TRANSCODE_JOB_TIMEOUT_SECS",
            EnvKey::StallWindowSecs => "TRANSCODE_STALL_WINDOW_SECS",
            EnvKey::MonitorIntervalSecs => "TRANSCODE_MONITOR_INTERVAL_SECS",
            EnvKey::PurgeIntervalSecs => "TRANSCODE_PURGE_INTERVAL_SECS",
            EnvKey::CompletionGraceMs => "TRANSCODE_COMPLETION_GRACE_MS",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
