use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tracks every local file a job creates so the terminal paths can remove all
/// of them. Deletion is dependency-ordered: the worker calls `cleanup` only
/// after the job reaches a terminal state, which on the success path is after
/// every upload has been confirmed.
pub struct ScratchSpace {
    dir: PathBuf,
    tracked: Vec<PathBuf>,
}

impl ScratchSpace {
    /// Creates the per-content scratch directory. Filenames inside are
    /// namespaced by content id, so concurrent jobs never collide.
    pub async fn create(root: &Path, content_id: &str) -> std::io::Result<Self> {
        let dir = root.join(content_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            tracked: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserves a path inside the scratch dir and tracks it for cleanup.
    pub fn path_for(&mut self, file_name: &str) -> PathBuf {
        let path = self.dir.join(file_name);
        self.track(path.clone());
        path
    }

    /// Tracks a file that lives outside the scratch dir (the uploaded source).
    pub fn track(&mut self, path: PathBuf) {
        self.tracked.push(path);
    }

    /// Best-effort removal of every tracked file, then the directory itself.
    pub async fn cleanup(self) {
        for path in &self.tracked {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!("removed scratch file {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("failed to remove scratch file {:?}: {}", path, e),
            }
        }

        if let Err(e) = tokio::fs::remove_dir(&self.dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove scratch dir {:?}: {}", self.dir, e);
            }
        }
    }
}
