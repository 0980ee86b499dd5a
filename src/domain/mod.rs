mod compression_level;
mod conversion_parameters;
mod job;
mod job_id;
mod job_status;
mod output_format;
mod quality;
mod source_image;
mod storage_path;

pub use compression_level::CompressionLevel;
pub use conversion_parameters::{ConversionParameters, ParameterError};
pub use job::{ConversionJob, StatusUpdate};
pub use job_id::JobId;
pub use job_status::JobStatus;
pub use output_format::OutputFormat;
pub use quality::{DEFAULT_QUALITY, MAX_QUALITY, MIN_QUALITY, Quality};
pub use source_image::{ACCEPTED_CONTENT_TYPES, SourceImage};
pub use storage_path::StoragePath;
