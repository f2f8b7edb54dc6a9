//! In-memory stand-ins for the pipeline's collaborators. Test-only.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::infrastructure::storage::s3::ObjectStore;
use crate::media::encoder::{AudioEncodeSpec, Encoder, VideoEncodeSpec};
use crate::media::packager::{Packager, PackagerInput};
use crate::media::probe::{MediaProber, SourceInfo};
use crate::modules::transcode::content_store::ContentStore;
use crate::modules::transcode::error::TranscodeError;
use crate::modules::transcode::intake::UploadRequest;
use crate::modules::transcode::job_store::JobStore;
use crate::modules::transcode::model::{
    ContentRecord, ContentState, ContentUpdate, Job,
};
use crate::modules::transcode::progress::{ProgressEvent, ProgressSink};
use crate::modules::transcode::service::{JobQueue, TranscodeService, TranscodeTuning};

pub fn source_info(container: &str, height: u32) -> SourceInfo {
    SourceInfo {
        container: container.to_string(),
        height,
        video_codec: Some("h264".to_string()),
        audio_codec: Some("aac".to_string()),
        audio_channels: Some(2),
    }
}

pub fn source_info_with_audio(
    container: &str,
    height: u32,
    audio_codec: Option<&str>,
    audio_channels: Option<u32>,
) -> SourceInfo {
    SourceInfo {
        container: container.to_string(),
        height,
        video_codec: Some("h264".to_string()),
        audio_codec: audio_codec.map(str::to_string),
        audio_channels,
    }
}

pub struct MockProber {
    info: SourceInfo,
}

#[async_trait]
impl MediaProber for MockProber {
    async fn probe(&self, _path: &Path) -> Result<SourceInfo, TranscodeError> {
        Ok(self.info.clone())
    }
}

#[derive(Default)]
pub struct MockEncoder {
    audio: Mutex<Vec<AudioEncodeSpec>>,
    video: Mutex<Vec<VideoEncodeSpec>>,
    fail_at_height: Mutex<Option<u32>>,
}

impl MockEncoder {
    pub fn fail_at_height(&self, height: u32) {
        *self.fail_at_height.lock().unwrap() = Some(height);
    }

    pub fn audio_calls(&self) -> usize {
        self.audio.lock().unwrap().len()
    }

    pub fn video_calls(&self) -> usize {
        self.video.lock().unwrap().len()
    }

    pub fn video_heights(&self) -> Vec<u32> {
        self.video.lock().unwrap().iter().map(|s| s.height).collect()
    }
}

#[async_trait]
impl Encoder for MockEncoder {
    async fn encode_audio(&self, spec: &AudioEncodeSpec) -> Result<(), TranscodeError> {
        self.audio.lock().unwrap().push(spec.clone());
        std::fs::write(&spec.output, b"audio").map_err(TranscodeError::Io)?;
        Ok(())
    }

    async fn encode_video(&self, spec: &VideoEncodeSpec) -> Result<(), TranscodeError> {
        self.video.lock().unwrap().push(spec.clone());

        if *self.fail_at_height.lock().unwrap() == Some(spec.height) {
            return Err(TranscodeError::Encoding(format!(
                "simulated encoder failure at {}p",
                spec.height
            )));
        }

        std::fs::write(&spec.output, b"video").map_err(TranscodeError::Io)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MockPackager {
    calls: AtomicU32,
    skip_manifest: AtomicBool,
}

impl MockPackager {
    pub fn skip_manifest(&self) {
        self.skip_manifest.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Packager for MockPackager {
    async fn package(
        &self,
        inputs: &[PackagerInput],
        manifest_output: &Path,
    ) -> Result<(), TranscodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        for input in inputs {
            std::fs::write(&input.output, b"packaged").map_err(TranscodeError::Io)?;
        }

        if !self.skip_manifest.load(Ordering::SeqCst) {
            std::fs::write(manifest_output, b"<MPD/>").map_err(TranscodeError::Io)?;
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    keys: Mutex<HashSet<String>>,
    puts: Mutex<Vec<String>>,
    probes: AtomicU32,
    collide: bool,
    fail_puts: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every existence probe reports a collision, as if each candidate key
    /// were pre-seeded in the bucket.
    pub fn with_collisions() -> Self {
        Self {
            collide: true,
            ..Self::default()
        }
    }

    pub fn fail_puts(&self) {
        self.fail_puts.store(true, Ordering::SeqCst);
    }

    pub fn exist_probes(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn upload_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }

    pub fn uploaded_keys(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_file(&self, key: &str, path: &Path) -> Result<String, TranscodeError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(TranscodeError::Upload(format!(
                "simulated upload failure for {}",
                key
            )));
        }
        if !path.exists() {
            return Err(TranscodeError::Upload(format!(
                "local file missing: {:?}",
                path
            )));
        }

        self.keys.lock().unwrap().insert(key.to_string());
        self.puts.lock().unwrap().push(key.to_string());
        Ok(format!("test-bucket/{}", key))
    }

    async fn exists(&self, key: &str) -> Result<bool, TranscodeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.collide || self.keys.lock().unwrap().contains(key))
    }
}

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

impl MemoryJobStore {
    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn job(&self, job_id: Uuid) -> Option<Job> {
        self.jobs.lock().unwrap().get(&job_id).cloned()
    }

    pub fn insert(&self, job: Job) {
        self.jobs.lock().unwrap().insert(job.job_id, job);
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &Job) -> Result<(), TranscodeError> {
        self.insert(job.clone());
        Ok(())
    }

    async fn save(&self, job: &Job) -> Result<(), TranscodeError> {
        self.insert(job.clone());
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, TranscodeError> {
        Ok(self.job(job_id))
    }

    async fn active_for_owner(&self, owner: &str) -> Result<Option<Job>, TranscodeError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .values()
            .find(|j| j.owner == owner && !j.status.is_terminal())
            .cloned())
    }

    async fn all(&self) -> Result<Vec<Job>, TranscodeError> {
        Ok(self.jobs.lock().unwrap().values().cloned().collect())
    }

    async fn remove(&self, job_id: Uuid) -> Result<(), TranscodeError> {
        self.jobs.lock().unwrap().remove(&job_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryContentStore {
    records: Mutex<HashMap<String, ContentRecord>>,
}

impl MemoryContentStore {
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn record(&self, content_id: &str) -> Option<ContentRecord> {
        self.records.lock().unwrap().get(content_id).cloned()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn create_placeholder(
        &self,
        content_id: &str,
        owner: &str,
        title: Option<&str>,
    ) -> Result<(), TranscodeError> {
        let now = OffsetDateTime::now_utc();
        self.records.lock().unwrap().insert(
            content_id.to_string(),
            ContentRecord {
                content_id: content_id.to_string(),
                owner_username: owner.to_string(),
                title: title.map(str::to_string),
                manifest_location: None,
                rendition_locations: Vec::new(),
                state: ContentState::Processing { since: now },
                created_at: now,
            },
        );
        Ok(())
    }

    async fn get(&self, content_id: &str) -> Result<Option<ContentRecord>, TranscodeError> {
        Ok(self.record(content_id))
    }

    async fn finalize(
        &self,
        content_id: &str,
        _owner: &str,
        update: &ContentUpdate,
    ) -> Result<(), TranscodeError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(content_id)
            .ok_or_else(|| TranscodeError::Store(format!("no record for {}", content_id)))?;

        record.manifest_location = Some(update.manifest_location.clone());
        record.rendition_locations = update.rendition_locations.clone();
        record.state = update.state.clone();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryQueue {
    jobs: Mutex<Vec<Job>>,
}

impl MemoryQueue {
    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn pop(&self) -> Option<Job> {
        let mut jobs = self.jobs.lock().unwrap();
        if jobs.is_empty() { None } else { Some(jobs.remove(0)) }
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: &Job) -> Result<(), TranscodeError> {
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<(String, ProgressEvent)>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<(String, ProgressEvent)> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgress {
    async fn publish(&self, channel: &str, event: &ProgressEvent) -> Result<(), TranscodeError> {
        self.events
            .lock()
            .unwrap()
            .push((channel.to_string(), event.clone()));
        Ok(())
    }
}

/// A fully wired service over in-memory collaborators plus handles to each of
/// them for assertions.
pub struct TestHarness {
    pub service: TranscodeService,
    pub encoder: Arc<MockEncoder>,
    pub packager: Arc<MockPackager>,
    pub object_store: Arc<MemoryObjectStore>,
    pub job_store: Arc<MemoryJobStore>,
    pub content_store: Arc<MemoryContentStore>,
    pub queue: Arc<MemoryQueue>,
    pub progress: Arc<RecordingProgress>,
    pub tmp: tempfile::TempDir,
}

impl TestHarness {
    pub fn new(info: SourceInfo) -> Self {
        let tmp = tempfile::tempdir().unwrap();

        let tuning = TranscodeTuning {
            scratch_dir: tmp.path().join("scratch"),
            worker_slots: 1,
            max_attempts: 2,
            job_timeout_secs: 3600,
            stall_window_secs: 0,
            monitor_interval_secs: 1,
            purge_interval_secs: 1,
            completion_grace_ms: 0,
        };

        let encoder = Arc::new(MockEncoder::default());
        let packager = Arc::new(MockPackager::default());
        let object_store = Arc::new(MemoryObjectStore::new());
        let job_store = Arc::new(MemoryJobStore::default());
        let content_store = Arc::new(MemoryContentStore::default());
        let queue = Arc::new(MemoryQueue::default());
        let progress = Arc::new(RecordingProgress::default());

        let service = TranscodeService {
            tuning,
            prober: Arc::new(MockProber { info }),
            encoder: encoder.clone(),
            packager: packager.clone(),
            object_store: object_store.clone(),
            job_store: job_store.clone(),
            content_store: content_store.clone(),
            queue: queue.clone(),
            progress: progress.clone(),
        };

        Self {
            service,
            encoder,
            packager,
            object_store,
            job_store,
            content_store,
            queue,
            progress,
            tmp,
        }
    }

    pub fn upload_request(&self, owner: &str) -> UploadRequest {
        self.upload_request_titled(owner, None)
    }

    pub fn upload_request_titled(&self, owner: &str, title: Option<&str>) -> UploadRequest {
        let path = self.tmp.path().join(format!("{}_source.mp4", owner));
        std::fs::write(&path, b"source bytes").unwrap();

        UploadRequest {
            owner: owner.to_string(),
            source_path: path,
            declared_ext: "mp4".to_string(),
            title: title.map(str::to_string),
            include_audio: true,
        }
    }

    /// Submits an upload and pulls the resulting job off the queue, the way
    /// the worker would receive it.
    pub async fn submit_and_take_job(&self, owner: &str) -> Job {
        self.service
            .submit(self.upload_request(owner))
            .await
            .unwrap();
        self.queue.pop().unwrap()
    }
}
