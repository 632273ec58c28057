//! Artifact sinks: where rendered rows go.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::PlacardError;

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// 1-based input row.
    pub row: usize,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Receives artifacts in input order.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn emit(&self, artifact: Artifact) -> Result<(), PlacardError>;
}

/// Writes each artifact as a file under a directory, created on demand.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn emit(&self, artifact: Artifact) -> Result<(), PlacardError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&artifact.file_name);
        tokio::fs::write(&path, &artifact.bytes).await?;
        tracing::debug!(path = %path.display(), bytes = artifact.bytes.len(), "artifact written");
        Ok(())
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: Mutex<Vec<Artifact>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn artifacts(&self) -> Vec<Artifact> {
        self.artifacts.lock().await.clone()
    }

    pub async fn file_names(&self) -> Vec<String> {
        self.artifacts
            .lock()
            .await
            .iter()
            .map(|a| a.file_name.clone())
            .collect()
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn emit(&self, artifact: Artifact) -> Result<(), PlacardError> {
        self.artifacts.lock().await.push(artifact);
        Ok(())
    }
}
