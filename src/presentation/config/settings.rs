use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::application::services::{
    BatchLimits, DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_MAX_FILE_SIZE_BYTES,
    DEFAULT_MAX_FILES_PER_BATCH, DEFAULT_MAX_PARALLEL_CONVERSIONS, WorkerConfig,
};

use super::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub conversion: ConversionSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub staging_path: String,
    pub archive_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversionSettings {
    pub max_files_per_batch: usize,
    pub max_file_size_bytes: usize,
    pub max_concurrent_jobs: usize,
    pub max_parallel_conversions: usize,
    pub conversion_timeout_secs: u64,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub enable_json: bool,
}

impl Settings {
    /// Layers built-in defaults, the optional `appsettings.{environment}` file
    /// and `APP_`-prefixed environment variables (`APP_SERVER__PORT=8080`).
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.public_base_url", "http://localhost:3000")?
            .set_default("storage.staging_path", "tmp/staging")?
            .set_default("storage.archive_path", "tmp/downloads")?
            .set_default("conversion.max_files_per_batch", DEFAULT_MAX_FILES_PER_BATCH as i64)?
            .set_default("conversion.max_file_size_bytes", DEFAULT_MAX_FILE_SIZE_BYTES as i64)?
            .set_default("conversion.max_concurrent_jobs", DEFAULT_MAX_CONCURRENT_JOBS as i64)?
            .set_default(
                "conversion.max_parallel_conversions",
                DEFAULT_MAX_PARALLEL_CONVERSIONS as i64,
            )?
            .set_default("conversion.conversion_timeout_secs", 30)?
            .set_default("conversion.queue_capacity", 64)?
            .set_default("database.max_connections", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.enable_json", false)?
            .add_source(
                File::with_name(&format!("appsettings.{}", environment.as_str())).required(false),
            )
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl ConversionSettings {
    pub fn batch_limits(&self) -> BatchLimits {
        BatchLimits {
            max_files_per_batch: self.max_files_per_batch,
            max_file_size_bytes: self.max_file_size_bytes,
        }
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            max_concurrent_jobs: self.max_concurrent_jobs,
            max_parallel_conversions: self.max_parallel_conversions,
            conversion_timeout: self.conversion_timeout(),
        }
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }
}
