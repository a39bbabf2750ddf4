//! Configuration loading from multiple sources

use crate::{AppConfig, ConfigError, Result};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;

/// Configuration loader with support for multiple formats and sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    ///
    /// Supports TOML and JSON formats based on file extension
    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let content = std::fs::read_to_string(path)?;

        match extension {
            "toml" => Self::from_toml(&content),
            "json" => Self::from_json(&content),
            _ => Err(ConfigError::LoadError(format!(
                "Unsupported file extension: {}",
                extension
            ))),
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<AppConfig> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from JSON string
    pub fn from_json(content: &str) -> Result<AppConfig> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from environment variables
    ///
    /// Uses default prefix "SOKONI"
    pub fn from_env() -> Result<AppConfig> {
        Self::from_env_with_prefix("SOKONI")
    }

    /// Load configuration from environment variables with custom prefix
    ///
    /// Environment variables should be in the format: PREFIX_SECTION_KEY
    /// For example: SOKONI_PAYMENT_CURRENCY=XAF
    pub fn from_env_with_prefix(prefix: &str) -> Result<AppConfig> {
        let config = Config::builder()
            .add_source(Environment::with_prefix(prefix).separator("_"))
            .build()?;

        config.try_deserialize().map_err(ConfigError::from)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Both sources flow through a single builder, so env values override
    /// only the keys they name; every other key keeps the file's value.
    pub fn from_file_with_env(path: &Path, env_prefix: &str) -> Result<AppConfig> {
        Self::builder()
            .add_file(path, true)
            .add_env(env_prefix)
            .build()
    }

    /// Build configuration using the config crate's builder pattern
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder {
            builder: Config::builder(),
        }
    }
}

/// Builder for complex configuration loading scenarios
pub struct ConfigLoaderBuilder {
    builder: ConfigBuilder<config::builder::DefaultState>,
}

impl ConfigLoaderBuilder {
    /// Add a configuration file source
    pub fn add_file(mut self, path: &Path, required: bool) -> Self {
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        };

        self.builder = self
            .builder
            .add_source(File::from(path).format(format).required(required));
        self
    }

    /// Add environment variable source with prefix
    pub fn add_env(mut self, prefix: &str) -> Self {
        self.builder = self
            .builder
            .add_source(Environment::with_prefix(prefix).separator("_"));
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<AppConfig> {
        let config = self.builder.build()?;
        config.try_deserialize().map_err(ConfigError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_toml() {
        let toml = r#"
            [service]
            environment = "staging"
            log_level = "debug"

            [payment]
            currency = "XAF"
            poll_interval_secs = 5
            max_poll_attempts = 12
            otp_length = 6

            [wallet]
            endpoint = "http://localhost:8080"

            [gateway]
            endpoint = "http://localhost:8081"
            timeout_ms = 15000
        "#;

        let config = ConfigLoader::from_toml(toml).unwrap();
        assert_eq!(config.service.log_level, "debug");
        assert_eq!(config.payment.max_poll_attempts, 12);
        assert_eq!(config.payment.otp_length, 6);
        assert_eq!(config.gateway.timeout_ms, 15000);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"
        {
            "service": { "environment": "production", "log_level": "warn" },
            "payment": { "currency": "XAF" },
            "wallet": { "endpoint": "http://localhost:8080" },
            "gateway": { "endpoint": "http://localhost:8081" }
        }
        "#;

        let config = ConfigLoader::from_json(json).unwrap();
        assert_eq!(config.service.log_level, "warn");
        // Omitted tunables fall back to defaults.
        assert_eq!(config.payment.poll_interval_secs, 10);
        assert_eq!(config.payment.max_poll_attempts, 30);
    }

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = ConfigLoader::from_toml("").unwrap();
        assert_eq!(config.payment.currency, "XAF");
        assert_eq!(config.payment.otp_length, 5);
        assert_eq!(config.proofs.key_prefix, "proofs");
    }

    #[test]
    fn test_file_with_empty_env_keeps_file_values() {
        let toml = r#"
            [payment]
            currency = "GHS"
            max_poll_attempts = 12
        "#;

        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        // No variables carry this prefix, so the file settings stand.
        let config = ConfigLoader::from_file_with_env(file.path(), "SOKONI_UNSET").unwrap();
        assert_eq!(config.payment.currency, "GHS");
        assert_eq!(config.payment.max_poll_attempts, 12);
        // Keys the file omits still fall back to defaults.
        assert_eq!(config.payment.otp_length, 5);
        assert_eq!(config.proofs.key_prefix, "proofs");
    }

    #[test]
    fn test_env_overrides_single_file_key() {
        let toml = r#"
            [payment]
            currency = "GHS"
            max_poll_attempts = 12
        "#;

        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        std::env::set_var("SOKONI_OVR_PAYMENT_CURRENCY", "KES");
        let config = ConfigLoader::from_file_with_env(file.path(), "SOKONI_OVR").unwrap();
        std::env::remove_var("SOKONI_OVR_PAYMENT_CURRENCY");

        assert_eq!(config.payment.currency, "KES");
        // Untouched file keys survive the overlay.
        assert_eq!(config.payment.max_poll_attempts, 12);
    }
}
