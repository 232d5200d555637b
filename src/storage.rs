use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

/// Where applicant resumes end up. Filenames are unique per (applicant, job)
/// pair, so concurrent writes for different applications never collide.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn put(&self, filename: &str, body: Bytes) -> anyhow::Result<()>;
    async fn delete(&self, filename: &str) -> anyhow::Result<()>;
}

/// Resumes on the local filesystem under a configured upload directory.
#[derive(Clone)]
pub struct LocalResumeStore {
    dir: PathBuf,
}

impl LocalResumeStore {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create upload dir {}", dir.display()))?;
        Ok(Self { dir })
    }
}

#[async_trait]
impl ResumeStore for LocalResumeStore {
    async fn put(&self, filename: &str, body: Bytes) -> anyhow::Result<()> {
        let path = self.dir.join(filename);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write resume {}", path.display()))?;
        debug!(path = %path.display(), bytes = body.len(), "resume stored");
        Ok(())
    }

    async fn delete(&self, filename: &str) -> anyhow::Result<()> {
        let path = self.dir.join(filename);
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("delete resume {}", path.display()))?;
        Ok(())
    }
}
