use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Bundles named blobs into a single compressed archive.
#[async_trait]
pub trait Archiver: Send + Sync {
    async fn bundle(&self, entries: Vec<ArchiveEntry>) -> Result<Vec<u8>, ArchiverError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiverError {
    #[error("archive write failed: {0}")]
    Write(String),
    #[error("archive task failed: {0}")]
    Task(String),
}
