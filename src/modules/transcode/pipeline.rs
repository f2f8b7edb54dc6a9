use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::media::encoder::{AudioEncodeSpec, VideoEncodeSpec};
use crate::modules::transcode::error::TranscodeError;
use crate::modules::transcode::ladder::{self, Rung, Step};
use crate::modules::transcode::model::{Job, JobStatus, Rendition, RenditionTag};
use crate::modules::transcode::progress::ProgressEvent;
use crate::modules::transcode::scratch::ScratchSpace;
use crate::modules::transcode::service::TranscodeService;

impl TranscodeService {
    /// Drives one delivered job through the whole pipeline as a single unit of
    /// work: ladder, manifest, uploads, finalization. Every error is absorbed
    /// here into a job-failure transition; nothing propagates to the caller.
    /// Scratch files are removed on every terminal path.
    pub async fn process(&self, delivered: Job) {
        // The queue delivery is just a pointer; the store record is
        // authoritative (the monitor may have bumped attempts since).
        let mut job = match self.job_store.get(delivered.job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!("job {} has no record, ignoring stale delivery", delivered.job_id);
                return;
            }
            Err(e) => {
                error!("failed to load job {}: {}", delivered.job_id, e);
                return;
            }
        };

        if job.status.is_terminal() {
            warn!("job {} already {}, ignoring redelivery", job.job_id, job.status.as_str());
            return;
        }

        job.status = JobStatus::Processing;
        job.touch();
        if let Err(e) = self.job_store.save(&job).await {
            error!("failed to mark job {} processing: {}", job.job_id, e);
            return;
        }

        let mut scratch = match ScratchSpace::create(&self.tuning.scratch_dir, &job.content_id).await
        {
            Ok(scratch) => scratch,
            Err(e) => {
                self.fail_job(&mut job, &TranscodeError::Io(e)).await;
                return;
            }
        };
        // The uploaded source lives outside the scratch dir but dies with the job.
        scratch.track(job.source_path.clone());

        let remaining = job.deadline - OffsetDateTime::now_utc();
        let result = match std::time::Duration::try_from(remaining) {
            Ok(budget) => match tokio::time::timeout(budget, self.execute(&mut job, &mut scratch))
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    // No cancellation reaches the external tool; it runs on
                    // while we abandon the bookkeeping.
                    warn!("job {} exceeded its deadline, abandoning", job.job_id);
                    Err(TranscodeError::Encoding("job deadline exceeded".to_string()))
                }
            },
            // Deadline already in the past.
            Err(_) => Err(TranscodeError::Encoding("job deadline exceeded".to_string())),
        };

        match result {
            Ok(manifest_location) => {
                job.status = JobStatus::Completed;
                job.touch();
                if let Err(e) = self.job_store.save(&job).await {
                    error!("failed to mark job {} completed: {}", job.job_id, e);
                }
                info!("✅ job {} completed: {}", job.job_id, manifest_location);
            }
            Err(e) => self.fail_job(&mut job, &e).await,
        }

        scratch.cleanup().await;
    }

    async fn fail_job(&self, job: &mut Job, err: &TranscodeError) {
        error!("❌ job {} failed: {}", job.job_id, err);

        self.notify(
            job,
            &ProgressEvent::Failed {
                reason: err.to_string(),
            },
        )
        .await;

        job.status = JobStatus::Failed;
        job.touch();
        if let Err(e) = self.job_store.save(job).await {
            error!("failed to mark job {} failed: {}", job.job_id, e);
        }
    }

    async fn execute(
        &self,
        job: &mut Job,
        scratch: &mut ScratchSpace,
    ) -> Result<String, TranscodeError> {
        let renditions = self.run_ladder(job, scratch).await?;
        let renditions = self.build_manifest(job, scratch, renditions).await?;
        let uploaded = self.upload_artifacts(job, &renditions).await?;
        self.finalize(job, &uploaded).await
    }

    /// Iterates the planned step list, accumulating renditions and halting on
    /// the first error. No partial result ever reaches a later stage.
    async fn run_ladder(
        &self,
        job: &mut Job,
        scratch: &mut ScratchSpace,
    ) -> Result<Vec<Rendition>, TranscodeError> {
        let steps = ladder::plan_steps(&job.source, job.include_audio);
        let total = steps.len() as u32;
        let mut renditions = Vec::with_capacity(steps.len());

        for (idx, step) in steps.into_iter().enumerate() {
            let detail = match step {
                Step::Audio => "audio".to_string(),
                Step::Video(rung) => format!("{}p", rung.height),
            };
            self.notify(
                job,
                &ProgressEvent::StepStarted {
                    step: idx as u32 + 1,
                    total,
                    detail,
                },
            )
            .await;

            let rendition = match step {
                Step::Audio => self.run_audio_step(job, scratch).await?,
                Step::Video(rung) => self.run_video_step(job, scratch, rung).await?,
            };

            self.notify(
                job,
                &ProgressEvent::RenditionReady {
                    tag: rendition.tag.clone(),
                },
            )
            .await;

            renditions.push(rendition);

            job.step_index += 1;
            job.touch();
            self.job_store.save(job).await?;
        }

        Ok(renditions)
    }

    /// Fails before any video step runs when the source audio is unusable: a
    /// video without a valid audio track is never produced.
    async fn run_audio_step(
        &self,
        job: &Job,
        scratch: &mut ScratchSpace,
    ) -> Result<Rendition, TranscodeError> {
        let codec = job.source.audio_codec.as_deref().unwrap_or("none");
        if !ladder::audio_codec_supported(codec) {
            return Err(TranscodeError::UnsupportedAudioCodec(codec.to_string()));
        }

        let tag = RenditionTag::Audio {
            codec: ladder::TARGET_AUDIO_CODEC.to_string(),
        };
        let output = scratch.path_for(&format!("raw_{}", tag.file_name()));

        self.encoder
            .encode_audio(&AudioEncodeSpec {
                source: job.source_path.clone(),
                output: output.clone(),
                // Some muxers report zero channels; force stereo then.
                force_stereo: matches!(job.source.audio_channels, None | Some(0)),
            })
            .await?;

        Ok(Rendition {
            local_path: output,
            tag,
        })
    }

    async fn run_video_step(
        &self,
        job: &Job,
        scratch: &mut ScratchSpace,
        rung: Rung,
    ) -> Result<Rendition, TranscodeError> {
        let tag = RenditionTag::Video {
            height: rung.height,
        };
        let output = scratch.path_for(&format!("raw_{}", tag.file_name()));

        self.encoder
            .encode_video(&VideoEncodeSpec {
                source: job.source_path.clone(),
                output: output.clone(),
                height: rung.height,
                bitrate_kbps: rung.bitrate_kbps,
                preset: ladder::preset_for(job.source.video_codec.as_deref()),
            })
            .await?;

        Ok(Rendition {
            local_path: output,
            tag,
        })
    }

    pub(crate) async fn notify(&self, job: &Job, event: &ProgressEvent) {
        if let Err(e) = self.progress.publish(&job.progress_channel, event).await {
            warn!("failed to publish progress for job {}: {}", job.job_id, e);
        }
    }
}
