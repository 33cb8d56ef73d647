use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub weather: WeatherConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Weather provider (OpenWeather) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    /// API key. Empty means the provider is not configured; fetches fail
    /// with a credentials error rather than hitting the network.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// Unit system passed through to the provider (metric, imperial).
    #[serde(default = "default_weather_units")]
    pub units: String,

    #[serde(default = "default_weather_timeout")]
    pub timeout_secs: u64,
}

/// Refresh scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Ceiling on the scheduler's timed wait, in seconds. A trigger or
    /// shutdown signal cuts the wait short.
    #[serde(default = "default_wakeup_timeout")]
    pub wakeup_timeout_secs: u64,

    /// Whether a refresh pass re-evaluates sub-zone activation against the
    /// group's threshold map. Off by default: activation is then driven only
    /// by explicit edits.
    #[serde(default)]
    pub evaluate_thresholds: bool,

    /// Smallest accepted sampling cell size, in meters.
    #[serde(default = "default_min_sampling_size")]
    pub min_sampling_size: u32,

    /// Smallest accepted refresh cadence, in seconds.
    #[serde(default = "default_min_refresh_rate")]
    pub min_refresh_rate: u32,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}
fn default_weather_units() -> String {
    "metric".to_string()
}
fn default_weather_timeout() -> u64 {
    10
}
fn default_wakeup_timeout() -> u64 {
    60
}
fn default_min_sampling_size() -> u32 {
    1000
}
fn default_min_refresh_rate() -> u32 {
    600
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with ZW__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("ZW").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds the config entirely from embedded defaults and overrides so
    /// tests do not depend on the config directory.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = "postgres://localhost:5432/zone_watch_test"
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "pretty"

            [security]
            cors_origins = []

            [weather]
            api_key = ""
            base_url = "https://api.openweathermap.org/data/2.5/weather"
            units = "metric"
            timeout_secs = 10

            [scheduler]
            wakeup_timeout_secs = 60
            evaluate_thresholds = false
            min_sampling_size = 1000
            min_refresh_rate = 600
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "ZW__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.scheduler.wakeup_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "scheduler wakeup_timeout_secs cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Pool settings in the shape the persistence layer consumes.
    pub fn pool_settings(&self) -> persistence::db::PoolSettings {
        persistence::db::PoolSettings {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            min_connections: self.database.min_connections,
            connect_timeout_secs: self.database.connect_timeout_secs,
            idle_timeout_secs: self.database.idle_timeout_secs,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .expect("Invalid socket address")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load_with_defaults() {
        let config = Config::load_for_test(&[]).expect("Failed to load config");

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.scheduler.wakeup_timeout_secs, 60);
        assert!(!config.scheduler.evaluate_thresholds);
        assert_eq!(config.weather.units, "metric");
    }

    #[test]
    fn test_config_override() {
        let config = Config::load_for_test(&[
            ("server.port", "9000"),
            ("scheduler.evaluate_thresholds", "true"),
            ("weather.api_key", "secret"),
        ])
        .expect("Failed to load config");

        assert_eq!(config.server.port, 9000);
        assert!(config.scheduler.evaluate_thresholds);
        assert_eq!(config.weather.api_key, "secret");
    }

    #[test]
    fn test_config_validation_missing_db_url() {
        let config = Config::load_for_test(&[("database.url", "")]).expect("Failed to load config");
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("ZW__DATABASE__URL"));
    }

    #[test]
    fn test_config_validation_invalid_pool_settings() {
        let config = Config::load_for_test(&[
            ("database.min_connections", "100"),
            ("database.max_connections", "10"),
        ])
        .expect("Failed to load config");

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("min_connections"));
    }

    #[test]
    fn test_config_validation_zero_wakeup_timeout() {
        let config = Config::load_for_test(&[("scheduler.wakeup_timeout_secs", "0")])
            .expect("Failed to load config");

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::load_for_test(&[("server.host", "127.0.0.1"), ("server.port", "3000")])
            .expect("Failed to load config");

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn test_pool_settings_conversion() {
        let config = Config::load_for_test(&[]).expect("Failed to load config");
        let pool = config.pool_settings();
        assert_eq!(pool.url, config.database.url);
        assert_eq!(pool.max_connections, 20);
    }
}
