use anyhow::{ensure, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub chat_api: ChatApiConfig,
    pub cache: CacheConfig,
    pub reply_polling: ReplyPollingConfig,
    pub contact: ContactConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Empty list means any origin is allowed.
    pub allowed_origins: Vec<String>,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            allowed_origins: Vec::new(),
            body_limit_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when RUST_LOG is not set
    pub level: String,
    pub json: bool,
    /// Directory for daily rolling log files (stdout only when unset)
    pub directory: Option<String>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,chat_relay_server=debug".to_string(),
            json: true,
            directory: None,
            file_prefix: "chat-relay-server.log".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ChatApiConfig {
    /// Chat platform base URL, including the webhook id path segment
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ChatApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://chat.botpress.cloud".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 5 * 60 }
    }
}

/// Polling policy used while waiting for the bot's reply
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ReplyPollingConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Upper bound of the random delay added on top of the backoff, as a fraction of it
    pub jitter_ratio: f64,
    /// Consecutive polls without message count growth before giving up
    pub no_change_limit: u32,
}

impl Default for ReplyPollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            initial_delay_ms: 500,
            max_delay_ms: 3000,
            backoff_multiplier: 1.5,
            jitter_ratio: 0.1,
            no_change_limit: 3,
        }
    }
}

impl ReplyPollingConfig {
    /// Reject values the backoff arithmetic cannot turn into a delay
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_attempts > 0, "reply_polling.max_attempts must be at least 1");
        ensure!(
            self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0,
            "reply_polling.backoff_multiplier must be a finite number >= 1.0, got {}",
            self.backoff_multiplier
        );
        ensure!(
            self.jitter_ratio.is_finite() && (0.0..=1.0).contains(&self.jitter_ratio),
            "reply_polling.jitter_ratio must be between 0.0 and 1.0, got {}",
            self.jitter_ratio
        );
        ensure!(
            self.initial_delay_ms <= self.max_delay_ms,
            "reply_polling.initial_delay_ms ({}) exceeds max_delay_ms ({})",
            self.initial_delay_ms,
            self.max_delay_ms
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ContactConfig {
    pub endpoint: String,
    pub access_key: Option<String>,
    pub timeout_seconds: u64,
    pub subject: String,
    pub from_name: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.web3forms.com/submit".to_string(),
            access_key: None,
            timeout_seconds: 15,
            subject: "New contact form submission".to_string(),
            from_name: "Website contact form".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.reply_polling.validate()?;
        Ok(settings)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
