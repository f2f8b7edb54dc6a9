use tracing::debug;

use crate::modules::transcode::error::TranscodeError;
use crate::modules::transcode::model::{Job, Rendition, UploadedArtifact, object_key};
use crate::modules::transcode::progress::ProgressEvent;
use crate::modules::transcode::service::TranscodeService;

impl TranscodeService {
    /// Pushes every local rendition (manifest included) to object storage,
    /// sequentially. The first failure aborts the rest; nothing local is
    /// deleted here — the scratch tracker removes files only after the job
    /// reaches a terminal state, which on success is after the final upload
    /// confirms.
    pub(crate) async fn upload_artifacts(
        &self,
        job: &Job,
        renditions: &[Rendition],
    ) -> Result<Vec<UploadedArtifact>, TranscodeError> {
        self.notify(
            job,
            &ProgressEvent::Uploading {
                artifacts: renditions.len() as u32,
            },
        )
        .await;

        let mut uploaded = Vec::with_capacity(renditions.len());

        for rendition in renditions {
            let key = object_key(&job.content_id, &rendition.tag);
            let location = self
                .object_store
                .put_file(&key, &rendition.local_path)
                .await?;

            debug!("uploaded {} rendition to {}", rendition.tag, location);

            uploaded.push(UploadedArtifact {
                location,
                tag: rendition.tag.clone(),
            });
        }

        Ok(uploaded)
    }
}
