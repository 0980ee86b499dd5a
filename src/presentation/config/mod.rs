mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    ConversionSettings, DatabaseSettings, LoggingSettings, ServerSettings, Settings,
    StorageSettings,
};
