use bytes::Bytes;

use super::OutputFormat;

pub const ACCEPTED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/avif"];

#[derive(Debug, Clone)]
pub struct SourceImage {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl SourceImage {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn is_accepted_content_type(content_type: &str) -> bool {
        ACCEPTED_CONTENT_TYPES.contains(&content_type)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// File name without directories or extension, restricted to characters
    /// that are safe inside an archive entry or storage key.
    pub fn stem(&self) -> String {
        let base = self
            .filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();
        let stem = match base.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => base,
        };
        let cleaned: String = stem
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if cleaned.is_empty() {
            String::from("image")
        } else {
            cleaned
        }
    }

    pub fn output_filename(&self, format: OutputFormat) -> String {
        format!("{}.{}", self.stem(), format.extension())
    }

    /// Output name for the image at `index` of a batch. The index prefix keeps
    /// names unique when several uploads share a stem.
    pub fn batch_output_filename(&self, index: usize, format: OutputFormat) -> String {
        format!("{:03}_{}", index, self.output_filename(format))
    }
}
