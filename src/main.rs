use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use transcode_service::config::settings::AppConfig;
use transcode_service::infrastructure::db::pool::connect_to_db;
use transcode_service::infrastructure::queue::rabbitmq::RabbitMqService;
use transcode_service::infrastructure::redis::client::RedisService;
use transcode_service::infrastructure::storage::s3::StorageService;
use transcode_service::state::AppState;
use transcode_service::workers::{monitor, transcoder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🚀 Starting transcode service...");

    let config = AppConfig::new()?;

    let db = connect_to_db(&config.database_url).await?;
    let redis = RedisService::new(&config.redis_url).await?;
    let storage = StorageService::new(
        &config.minio_url,
        &config.minio_bucket,
        &config.minio_access_key,
        &config.minio_secret_key,
    )
    .await;
    let queue = RabbitMqService::new(&config.amqp_url).await?;

    let state = AppState::new(config, db, redis, storage, queue);

    let monitor_state = state.clone();
    tokio::spawn(async move {
        monitor::start_job_monitor(monitor_state).await;
    });

    let worker_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = transcoder::start_transcoder_worker(worker_state).await {
            error!("transcode worker exited: {}", e);
        }
    });

    info!("✅ Transcode service is up");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    Ok(())
}
