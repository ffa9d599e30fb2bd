// Configuration management with layered configuration (file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub smtp: SmtpConfig,
    pub weather: WeatherConfig,
    pub scheduler: SchedulerConfig,
    pub worker: WorkerConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    /// Prefix for every queue key, so several deployments can share one
    /// Redis instance.
    pub key_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    #[serde(default)]
    pub from_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub poll_interval_seconds: u64,
    /// IANA timezone name used to evaluate cron expressions.
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub concurrency: u32,
    pub poll_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let defaults = Config::try_from(&Settings::default())?;

        let builder = Config::builder()
            // Start with default configuration
            .add_source(defaults)
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment-specific configuration
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings at process startup, before anything
    /// touches the queue or collaborators.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        if self.redis.url.is_empty() {
            return Err("Redis URL cannot be empty".to_string());
        }
        if self.redis.key_prefix.is_empty() {
            return Err("Redis key_prefix cannot be empty".to_string());
        }

        if self.smtp.host.is_empty() {
            return Err("SMTP host cannot be empty".to_string());
        }
        if self.smtp.from_address.is_empty() {
            return Err("SMTP from_address cannot be empty".to_string());
        }

        if self.weather.api_key.is_empty() {
            return Err("Weather API key cannot be empty".to_string());
        }
        if self.weather.base_url.is_empty() {
            return Err("Weather base_url cannot be empty".to_string());
        }

        if self.scheduler.poll_interval_seconds == 0 {
            return Err("Scheduler poll_interval_seconds must be greater than 0".to_string());
        }
        if self.scheduler.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(format!(
                "Scheduler timezone '{}' is not a valid IANA timezone",
                self.scheduler.timezone
            ));
        }

        if self.worker.concurrency == 0 {
            return Err("Worker concurrency must be greater than 0".to_string());
        }
        if self.worker.poll_interval_seconds == 0 {
            return Err("Worker poll_interval_seconds must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                key_prefix: "weather-email".to_string(),
            },
            smtp: SmtpConfig {
                host: "smtp.gmail.com".to_string(),
                port: 587,
                username: String::new(),
                password: String::new(),
                from_address: "weather-bot@localhost".to_string(),
                from_name: Some("Weather Bot".to_string()),
            },
            weather: WeatherConfig {
                api_key: "change-me".to_string(),
                base_url: "https://api.openweathermap.org/data/2.5".to_string(),
                timeout_seconds: 30,
            },
            scheduler: SchedulerConfig {
                poll_interval_seconds: 10,
                timezone: "UTC".to_string(),
            },
            worker: WorkerConfig {
                concurrency: 4,
                poll_interval_seconds: 1,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
            },
        }
    }
}
