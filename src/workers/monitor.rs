use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::modules::transcode::error::TranscodeError;
use crate::modules::transcode::model::{Job, JobStatus};
use crate::modules::transcode::progress::ProgressEvent;
use crate::modules::transcode::service::TranscodeService;
use crate::state::AppState;

/// What the monitor should do with one observed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorAction {
    Wait,
    Retry,
    Fail,
}

/// Classifies a job from its record alone. A Queued or Stalled job whose
/// record has not moved for a full window is retried while attempts remain
/// and failed once they run out. A Processing job is supervised only by its
/// absolute deadline: the worker saves the record per completed step, and a
/// single encode step can legitimately outlast the stall window, so a stale
/// Processing record does not mean a dead worker.
pub fn supervise(job: &Job, now: OffsetDateTime, window: time::Duration) -> SupervisorAction {
    if job.status.is_terminal() {
        return SupervisorAction::Wait;
    }

    if now >= job.deadline {
        return SupervisorAction::Fail;
    }

    let eligible_for_retry = matches!(job.status, JobStatus::Queued | JobStatus::Stalled);
    if eligible_for_retry && now - job.updated_at >= window {
        if job.attempts_made < job.max_attempts {
            return SupervisorAction::Retry;
        }
        return SupervisorAction::Fail;
    }

    SupervisorAction::Wait
}

/// One sweep over every live job record.
pub async fn observe(service: &TranscodeService) {
    let jobs = match service.job_store.all().await {
        Ok(jobs) => jobs,
        Err(e) => {
            error!("monitor failed to list jobs: {}", e);
            return;
        }
    };

    let now = OffsetDateTime::now_utc();
    let window = service.tuning.stall_window();

    for mut job in jobs {
        match supervise(&job, now, window) {
            SupervisorAction::Wait => {}
            SupervisorAction::Retry => {
                if let Err(e) = retry_stalled(service, &mut job).await {
                    error!("failed to re-enqueue stalled job {}: {}", job.job_id, e);
                }
            }
            SupervisorAction::Fail => {
                let reason = if now >= job.deadline {
                    "job deadline exceeded".to_string()
                } else {
                    format!("job stalled after {} attempts", job.attempts_made)
                };
                fail_supervised(service, &mut job, reason).await;
            }
        }
    }
}

/// Marks the job Stalled while it is being re-queued, then flips it back to
/// Queued once the delivery is on the wire. A worker picking the delivery up
/// reloads the record, so the bumped attempt count travels with it.
async fn retry_stalled(
    service: &TranscodeService,
    job: &mut Job,
) -> Result<(), TranscodeError> {
    warn!(
        "⚠️ job {} stalled as {}, re-enqueueing (attempt {}/{})",
        job.job_id,
        job.status.as_str(),
        job.attempts_made + 1,
        job.max_attempts
    );

    job.status = JobStatus::Stalled;
    job.attempts_made += 1;
    job.touch();
    service.job_store.save(job).await?;

    service.queue.enqueue(job).await?;

    job.status = JobStatus::Queued;
    job.touch();
    service.job_store.save(job).await?;

    Ok(())
}

async fn fail_supervised(service: &TranscodeService, job: &mut Job, reason: String) {
    error!("❌ job {} failed under supervision: {}", job.job_id, reason);

    service
        .notify(job, &ProgressEvent::Failed { reason })
        .await;

    job.status = JobStatus::Failed;
    job.touch();
    if let Err(e) = service.job_store.save(job).await {
        error!("failed to mark job {} failed: {}", job.job_id, e);
    }

    // No worker ever ran (or will run) this job to completion, so its local
    // files are removed here, in the same tolerant style as scratch cleanup.
    if let Err(e) = tokio::fs::remove_file(&job.source_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("failed to remove source {:?}: {}", job.source_path, e);
        }
    }

    let scratch = service.tuning.scratch_dir.join(&job.content_id);
    if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("failed to remove scratch dir {:?}: {}", scratch, e);
        }
    }
}

/// Drops terminal job records so the owner dedup pointer frees up and the
/// index does not grow without bound.
pub async fn purge_terminal(service: &TranscodeService) {
    let jobs = match service.job_store.all().await {
        Ok(jobs) => jobs,
        Err(e) => {
            error!("purge failed to list jobs: {}", e);
            return;
        }
    };

    let mut purged = 0usize;
    for job in jobs {
        if !job.status.is_terminal() {
            continue;
        }
        match service.job_store.remove(job.job_id).await {
            Ok(()) => purged += 1,
            Err(e) => error!("failed to purge job {}: {}", job.job_id, e),
        }
    }

    if purged > 0 {
        debug!("purged {} terminal job records", purged);
    }
}

pub async fn start_job_monitor(state: AppState) {
    info!("🩺 Starting job health monitor...");

    let service = state.transcoder();

    let mut observe_tick =
        tokio::time::interval(std::time::Duration::from_secs(service.tuning.monitor_interval_secs));
    let mut purge_tick =
        tokio::time::interval(std::time::Duration::from_secs(service.tuning.purge_interval_secs));

    loop {
        tokio::select! {
            _ = observe_tick.tick() => observe(&service).await,
            _ = purge_tick.tick() => purge_terminal(&service).await,
        }
    }
}
