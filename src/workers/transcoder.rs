use futures_util::StreamExt;
use lapin::options::BasicAckOptions;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::infrastructure::queue::rabbitmq::TRANSCODE_QUEUE;
use crate::modules::transcode::model::Job;
use crate::state::AppState;

/// Consumes the durable queue with a bounded pool of execution slots. A job
/// holds exactly one slot for its entire pipeline run; only job-to-job
/// execution is parallel, the stages inside a job stay serial.
pub async fn start_transcoder_worker(state: AppState) -> anyhow::Result<()> {
    info!("🎥 Starting transcode worker...");

    let service = state.transcoder();
    let slots = service.tuning.worker_slots;

    let mut consumer = state
        .queue
        .consumer(TRANSCODE_QUEUE, "transcode_worker", slots as u16)
        .await?;

    let semaphore = Arc::new(Semaphore::new(slots));

    info!(
        "🎥 Transcode worker listening on '{}' with {} slots",
        TRANSCODE_QUEUE, slots
    );

    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                error!("consumer error: {}", e);
                continue;
            }
        };

        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };

        let service = service.clone();
        tokio::spawn(async move {
            let _slot = permit;

            match serde_json::from_slice::<Job>(&delivery.data) {
                Ok(job) => {
                    info!("📦 received job {} for content {}", job.job_id, job.content_id);
                    service.process(job).await;
                }
                Err(e) => {
                    error!("❌ failed to parse job payload: {}", e);
                }
            }

            // Ack either way: the job store is authoritative, and a poison
            // payload must not loop forever.
            if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                error!("failed to ack message: {}", e);
            }
        });
    }

    Ok(())
}
