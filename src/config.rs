use crate::application::usecases::run_worker_once::WorkerConfig;
use crate::client::ManagerConfig;
use crate::domain::entities::job::JobType;
use crate::domain::workflows::retry_policy::RetryPolicy;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: Server,
    pub db: Db,
    pub auth: Auth,
    pub workers: Workers,
    pub producers: Producers,
    pub client: Client,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Db {
    /// `memory` selects the in-process store.
    pub url: String,
    /// Credential used only by the worker; falls back to `url`.
    #[serde(default)]
    pub worker_url: Option<String>,
}

impl Db {
    pub fn is_memory(&self) -> bool {
        self.url == "memory"
    }

    pub fn worker_url(&self) -> &str {
        self.worker_url.as_deref().unwrap_or(&self.url)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Auth {
    pub scheduler_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Workers {
    pub embedded: bool,
    pub tick_interval_ms: u64,
    pub max_jobs_per_tick: u32,
    pub stall_threshold_seconds: i64,
    pub heartbeat_interval_seconds: u64,
    pub max_inline_backoff_seconds: u64,
    pub max_processing_attempts: u32,
    pub max_retries: u32,
    pub story_spacing_ms: u64,
    pub audio_spacing_ms: u64,
    pub image_spacing_ms: u64,
}

impl Workers {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    pub fn worker_config(&self) -> WorkerConfig {
        let spacing = HashMap::from([
            (
                JobType::StoryGeneration,
                Duration::from_millis(self.story_spacing_ms),
            ),
            (
                JobType::AudioGeneration,
                Duration::from_millis(self.audio_spacing_ms),
            ),
            (
                JobType::ImageGeneration,
                Duration::from_millis(self.image_spacing_ms),
            ),
        ]);
        WorkerConfig {
            stall_threshold: time::Duration::seconds(self.stall_threshold_seconds),
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_seconds),
            retry_policy: self.retry_policy(),
            max_processing_attempts: self.max_processing_attempts,
            max_jobs_per_tick: self.max_jobs_per_tick,
            max_inline_backoff: Duration::from_secs(self.max_inline_backoff_seconds),
            spacing,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProducerMode {
    Http,
    /// Canned offline content, for local runs and demos.
    Scripted,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Producers {
    pub mode: ProducerMode,
    pub story_url: String,
    pub speech_url: String,
    pub image_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Client {
    pub poll_interval_ms: u64,
    pub fetch_limit: u32,
    pub retain_terminal: usize,
    pub cache_path: String,
}

impl Client {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            fetch_limit: self.fetch_limit,
            retain_terminal: self.retain_terminal,
        }
    }
}

/// Load settings from `config/default.toml`, `config/<env>.toml`, and env overrides.
pub fn load() -> Result<Settings, config::ConfigError> {
    let env_name = std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());
    config::Config::builder()
        .add_source(config::File::with_name("config/default"))
        .add_source(config::File::with_name(&format!("config/{env_name}")).required(false))
        .add_source(config::Environment::with_prefix("PAGECRAFT").separator("__"))
        .build()?
        .try_deserialize()
}
