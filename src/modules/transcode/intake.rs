use std::path::PathBuf;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::modules::transcode::error::TranscodeError;
use crate::modules::transcode::identity;
use crate::modules::transcode::ladder::MIN_SOURCE_HEIGHT;
use crate::modules::transcode::model::{Job, JobStatus};
use crate::modules::transcode::progress::{ProgressEvent, channel_for};
use crate::modules::transcode::service::TranscodeService;

/// Containers we accept, matched against the prober's token list.
const ALLOWED_CONTAINERS: &[&str] = &["mp4", "mov", "matroska", "webm"];

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub owner: String,
    pub source_path: PathBuf,
    /// Extension the client claimed; the probed container is authoritative.
    pub declared_ext: String,
    pub title: Option<String>,
    pub include_audio: bool,
}

#[derive(Debug, Clone)]
pub struct Accepted {
    pub progress_channel: String,
    pub content_id: Option<String>,
    /// True when the owner already had a live job and no new resources were
    /// allocated.
    pub redirected: bool,
}

fn container_allowed(format_name: &str) -> bool {
    format_name
        .split(',')
        .any(|token| ALLOWED_CONTAINERS.contains(&token.trim()))
}

impl TranscodeService {
    /// Validates an uploaded file and, unless the owner already has a live
    /// job, allocates a content id, writes the placeholder record, and puts
    /// the job on the durable queue. Exactly one ContentRecord and one Job per
    /// accepted (non-redirected) call.
    pub async fn submit(&self, req: UploadRequest) -> Result<Accepted, TranscodeError> {
        let source = self.prober.probe(&req.source_path).await?;

        if !container_allowed(&source.container) {
            return Err(TranscodeError::UnsupportedContainer(source.container));
        }

        if source.height < MIN_SOURCE_HEIGHT {
            return Err(TranscodeError::ResolutionTooLow {
                height: source.height,
                min: MIN_SOURCE_HEIGHT,
            });
        }

        // Idempotent redirect: one live job per owner.
        if let Some(existing) = self.job_store.active_for_owner(&req.owner).await? {
            info!(
                "owner {} already has job {} in flight, redirecting",
                req.owner, existing.job_id
            );
            return Ok(Accepted {
                progress_channel: existing.progress_channel,
                content_id: Some(existing.content_id),
                redirected: true,
            });
        }

        let content_id = match identity::allocate(self.object_store.as_ref()).await {
            Ok(id) => id,
            Err(e) => {
                // The upload is dead before a job exists; drop the source now.
                if let Err(rm) = tokio::fs::remove_file(&req.source_path).await {
                    warn!("failed to remove rejected source {:?}: {}", req.source_path, rm);
                }
                return Err(e);
            }
        };

        self.content_store
            .create_placeholder(&content_id, &req.owner, req.title.as_deref())
            .await?;

        let job_id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let job = Job {
            job_id,
            owner: req.owner,
            source_path: req.source_path,
            content_id: content_id.clone(),
            source,
            include_audio: req.include_audio,
            step_index: 0,
            attempts_made: 0,
            max_attempts: self.tuning.max_attempts,
            deadline: now + self.tuning.job_timeout(),
            progress_channel: channel_for(job_id),
            status: JobStatus::Queued,
            updated_at: now,
        };

        self.job_store.create(&job).await?;
        self.queue.enqueue(&job).await?;

        if let Err(e) = self
            .progress
            .publish(
                &job.progress_channel,
                &ProgressEvent::Queued {
                    content_id: content_id.clone(),
                },
            )
            .await
        {
            warn!("failed to publish queued event for {}: {}", job_id, e);
        }

        info!(
            "accepted upload from {} as content {} ({}.{} probed {}p)",
            job.owner, content_id, job_id, req.declared_ext, job.source.height
        );

        Ok(Accepted {
            progress_channel: job.progress_channel,
            content_id: Some(content_id),
            redirected: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::transcode::testkit::{TestHarness, source_info};

    #[tokio::test]
    async fn rejects_unsupported_containers_without_creating_anything() {
        let harness = TestHarness::new(source_info("flv", 1080));

        let err = harness
            .service
            .submit(harness.upload_request("owner1"))
            .await
            .unwrap_err();

        assert!(matches!(err, TranscodeError::UnsupportedContainer(_)));
        assert!(err.is_validation());
        assert_eq!(harness.job_store.len(), 0);
        assert_eq!(harness.content_store.len(), 0);
        assert_eq!(harness.queue.len(), 0);
    }

    #[tokio::test]
    async fn rejects_sources_below_the_lowest_rung_before_any_encode() {
        let harness = TestHarness::new(source_info("mov,mp4,m4a,3gp,3g2,mj2", 144));

        let err = harness
            .service
            .submit(harness.upload_request("owner1"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TranscodeError::ResolutionTooLow { height: 144, min: 240 }
        ));
        assert_eq!(harness.encoder.video_calls(), 0);
        assert_eq!(harness.encoder.audio_calls(), 0);
        assert_eq!(harness.job_store.len(), 0);
    }

    #[tokio::test]
    async fn second_submission_from_same_owner_redirects_to_live_job() {
        let harness = TestHarness::new(source_info("mov,mp4,m4a,3gp,3g2,mj2", 1080));

        let first = harness
            .service
            .submit(harness.upload_request("owner1"))
            .await
            .unwrap();
        assert!(!first.redirected);

        let second = harness
            .service
            .submit(harness.upload_request("owner1"))
            .await
            .unwrap();

        assert!(second.redirected);
        assert_eq!(second.progress_channel, first.progress_channel);
        assert_eq!(harness.job_store.len(), 1);
        assert_eq!(harness.content_store.len(), 1);
        assert_eq!(harness.queue.len(), 1);
    }

    #[tokio::test]
    async fn different_owners_get_independent_jobs() {
        let harness = TestHarness::new(source_info("matroska,webm", 720));

        let first = harness
            .service
            .submit(harness.upload_request("owner1"))
            .await
            .unwrap();
        let second = harness
            .service
            .submit(harness.upload_request("owner2"))
            .await
            .unwrap();

        assert!(!second.redirected);
        assert_ne!(first.progress_channel, second.progress_channel);
        assert_eq!(harness.job_store.len(), 2);
    }
}
