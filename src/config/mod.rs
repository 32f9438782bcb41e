//! Configuration loading

mod settings;

pub use settings::{
    CacheSettings, ClientSettings, InvalidationSettings, LogFormat, LoggingSettings,
    PolicySettings,
};
