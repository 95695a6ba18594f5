use common::{Environment, LogLevel};
use inference::ModelConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:8080",
    "http://localhost:5173",
    "http://localhost:5174",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub log_level: LogLevel,
    pub environment: Environment,
    /// OTLP collector; traces and metrics are exported only when set.
    pub otel_endpoint: Option<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 60,
            max_upload_bytes: 20 * 1024 * 1024,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// TrueType font for box labels; common system fonts are tried when unset.
    pub font_path: Option<PathBuf>,
    pub jpeg_quality: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            jpeg_quality: 90,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        self.model
            .validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;

        if !(1..=100).contains(&self.render.jpeg_quality) {
            return Err(config::ConfigError::Message(format!(
                "render.jpeg_quality must be in 1..=100, got {}",
                self.render.jpeg_quality
            )));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(config::ConfigError::Message(
                "server.max_upload_bytes must be non-zero".to_string(),
            ));
        }

        if self.server.host.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "server.host must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Defaults, then an optional `detector.toml`, then `DETECTOR_*` variables
/// (`DETECTOR_SERVER__PORT=8000`, `DETECTOR_MODEL__NMS_THRESHOLD=0.3`).
pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("log_level", "info")?
        .set_default("environment", "development")?
        .add_source(config::File::with_name("detector").required(false))
        .add_source(
            config::Environment::with_prefix("DETECTOR")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.allowed_origins")
                .try_parsing(true),
        )
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env() {
        for (key, _) in env::vars() {
            if key.starts_with("DETECTOR_") {
                unsafe { env::remove_var(key) };
            }
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();

        let config = get_configuration().unwrap();

        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.environment, Environment::Development);
        assert!(config.otel_endpoint.is_none());
        assert_eq!(config.server.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.server.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.server.allowed_origins.len(), 3);
        assert_eq!(config.model.confidence_threshold, 0.5);
        assert_eq!(config.model.nms_threshold, 0.4);
        assert_eq!(config.render.jpeg_quality, 90);
        assert!(config.render.font_path.is_none());
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_env();
        unsafe {
            env::set_var("DETECTOR_ENVIRONMENT", "production");
            env::set_var("DETECTOR_SERVER__PORT", "9000");
            env::set_var("DETECTOR_MODEL__CONFIDENCE_THRESHOLD", "0.25");
            env::set_var("DETECTOR_MODEL__MODEL_DIR", "/opt/yolo");
            env::set_var(
                "DETECTOR_SERVER__ALLOWED_ORIGINS",
                "http://a.example,http://b.example",
            );
        }

        let config = get_configuration();
        clear_env();
        let config = config.unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.model.confidence_threshold, 0.25);
        assert_eq!(config.model.model_dir, PathBuf::from("/opt/yolo"));
        assert_eq!(
            config.server.allowed_origins,
            vec!["http://a.example", "http://b.example"]
        );
    }

    #[test]
    #[serial]
    fn test_rejects_out_of_range_threshold() {
        clear_env();
        unsafe { env::set_var("DETECTOR_MODEL__NMS_THRESHOLD", "1.5") };

        let result = get_configuration();
        clear_env();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("nms_threshold"));
    }

    #[test]
    fn test_rejects_zero_jpeg_quality() {
        let config = Config {
            log_level: LogLevel::Info,
            environment: Environment::Development,
            otel_endpoint: None,
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            render: RenderConfig {
                font_path: None,
                jpeg_quality: 0,
            },
        };
        assert!(config.validate().is_err());
    }
}
