use std::io::{Cursor, Write};

use async_trait::async_trait;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::application::ports::{ArchiveEntry, Archiver, ArchiverError};

const DEFAULT_DEFLATE_LEVEL: i64 = 9;

/// Builds deflate-compressed zip archives in memory.
#[derive(Debug, Clone, Copy)]
pub struct ZipArchiver {
    level: i64,
}

impl ZipArchiver {
    pub fn new() -> Self {
        Self {
            level: DEFAULT_DEFLATE_LEVEL,
        }
    }

    pub fn with_level(level: i64) -> Self {
        Self {
            level: level.clamp(0, 9),
        }
    }

    fn write_archive(&self, entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiverError> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.level));

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in entries {
            writer
                .start_file(entry.name.as_str(), options)
                .map_err(|e| ArchiverError::Write(format!("{}: {}", entry.name, e)))?;
            writer
                .write_all(&entry.data)
                .map_err(|e| ArchiverError::Write(format!("{}: {}", entry.name, e)))?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| ArchiverError::Write(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

impl Default for ZipArchiver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Archiver for ZipArchiver {
    async fn bundle(&self, entries: Vec<ArchiveEntry>) -> Result<Vec<u8>, ArchiverError> {
        let archiver = *self;
        tokio::task::spawn_blocking(move || archiver.write_archive(&entries))
            .await
            .map_err(|e| ArchiverError::Task(e.to_string()))?
    }
}
