pub mod archive;
pub mod observability;
pub mod persistence;
pub mod storage;
pub mod transcoding;
