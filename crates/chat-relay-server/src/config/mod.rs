pub mod settings;

pub use settings::{
    CacheConfig, ChatApiConfig, ContactConfig, LoggingConfig, ReplyPollingConfig, ServerConfig,
    Settings,
};
