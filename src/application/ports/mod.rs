mod archiver;
mod job_repository;
mod repository_error;
mod staging_store;
mod transcoder;

pub use archiver::{ArchiveEntry, Archiver, ArchiverError};
pub use job_repository::JobRepository;
pub use repository_error::RepositoryError;
pub use staging_store::{StagingStore, StagingStoreError};
pub use transcoder::{Transcoder, TranscoderError};
