use time::OffsetDateTime;

use crate::modules::transcode::error::TranscodeError;
use crate::modules::transcode::model::{
    ContentState, ContentUpdate, Job, RenditionTag, UploadedArtifact,
};
use crate::modules::transcode::progress::ProgressEvent;
use crate::modules::transcode::service::TranscodeService;

/// Computes the one mutation the finalizer applies. Pure, so running it any
/// number of times over the same inputs yields the same update.
pub fn plan_finalization(
    uploaded: &[UploadedArtifact],
    title: Option<&str>,
    now: OffsetDateTime,
) -> Result<ContentUpdate, TranscodeError> {
    let manifest = uploaded
        .iter()
        .find(|a| a.tag == RenditionTag::Manifest)
        .ok_or_else(|| {
            TranscodeError::Packaging("no manifest among uploaded artifacts".to_string())
        })?;

    let rendition_locations = uploaded
        .iter()
        .filter(|a| a.tag != RenditionTag::Manifest)
        .cloned()
        .collect();

    let state = if title.is_some_and(|t| !t.trim().is_empty()) {
        ContentState::Published
    } else {
        ContentState::AwaitingInfo { since: now }
    };

    Ok(ContentUpdate {
        manifest_location: manifest.location.clone(),
        rendition_locations,
        state,
    })
}

impl TranscodeService {
    /// Persists the final locations onto the ContentRecord and the owner's
    /// mirrored entry, then announces completion. The caller marks the job
    /// Completed only after the grace delay, so job removal cannot race the
    /// notification reaching the client.
    pub(crate) async fn finalize(
        &self,
        job: &Job,
        uploaded: &[UploadedArtifact],
    ) -> Result<String, TranscodeError> {
        let title = self
            .content_store
            .get(&job.content_id)
            .await?
            .and_then(|record| record.title);

        let update = plan_finalization(uploaded, title.as_deref(), OffsetDateTime::now_utc())?;

        self.content_store
            .finalize(&job.content_id, &job.owner, &update)
            .await?;

        self.notify(
            job,
            &ProgressEvent::Completed {
                manifest_location: update.manifest_location.clone(),
            },
        )
        .await;

        tokio::time::sleep(self.tuning.completion_grace()).await;

        Ok(update.manifest_location)
    }
}
