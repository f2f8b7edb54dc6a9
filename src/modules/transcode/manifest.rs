use crate::media::packager::{PackagerInput, StreamKind};
use crate::modules::transcode::error::TranscodeError;
use crate::modules::transcode::model::{Job, Rendition, RenditionTag};
use crate::modules::transcode::progress::ProgressEvent;
use crate::modules::transcode::scratch::ScratchSpace;
use crate::modules::transcode::service::TranscodeService;

fn stream_kind(tag: &RenditionTag) -> StreamKind {
    match tag {
        RenditionTag::Video { .. } => StreamKind::Video,
        RenditionTag::Audio { .. } => StreamKind::Audio,
        RenditionTag::Manifest => StreamKind::Text,
    }
}

impl TranscodeService {
    /// One packager invocation over the full rendition list. Each rendition's
    /// local path is swapped to the packaged output, so later stages ship
    /// exactly what the manifest references; the manifest joins the list as
    /// its own rendition.
    pub(crate) async fn build_manifest(
        &self,
        job: &Job,
        scratch: &mut ScratchSpace,
        renditions: Vec<Rendition>,
    ) -> Result<Vec<Rendition>, TranscodeError> {
        self.notify(job, &ProgressEvent::Packaging).await;

        let manifest_path = scratch.path_for(&RenditionTag::Manifest.file_name());

        let mut inputs = Vec::with_capacity(renditions.len());
        let mut packaged = Vec::with_capacity(renditions.len() + 1);

        for rendition in renditions {
            let output = scratch.path_for(&rendition.tag.file_name());
            inputs.push(PackagerInput {
                input: rendition.local_path,
                kind: stream_kind(&rendition.tag),
                output: output.clone(),
            });
            packaged.push(Rendition {
                local_path: output,
                tag: rendition.tag,
            });
        }

        self.packager.package(&inputs, &manifest_path).await?;

        // The tool can exit zero without producing the manifest.
        if !tokio::fs::try_exists(&manifest_path).await.unwrap_or(false) {
            return Err(TranscodeError::Packaging(format!(
                "manifest not found at {:?} after packaging",
                manifest_path
            )));
        }

        packaged.push(Rendition {
            local_path: manifest_path,
            tag: RenditionTag::Manifest,
        });

        Ok(packaged)
    }
}
