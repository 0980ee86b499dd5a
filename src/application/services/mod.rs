mod bulk_conversion_service;
mod conversion_worker;
mod image_conversion_service;
mod job_status_service;
mod staged_outputs;

pub use bulk_conversion_service::{
    BatchLimits, BulkConversionError, BulkConversionMessage, BulkConversionService,
    DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_MAX_FILES_PER_BATCH,
};
pub use conversion_worker::{
    ConversionTally, ConversionWorker, ConversionWorkerError, DEFAULT_CONVERSION_TIMEOUT,
    DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_MAX_PARALLEL_CONVERSIONS, ImageFailure, WorkerConfig,
};
pub use image_conversion_service::{ConversionError, ConvertedImage, ImageConversionService};
pub use job_status_service::{JobStatusError, JobStatusService, JobStatusView};
pub use staged_outputs::{StagedOutput, StagedOutputs};
