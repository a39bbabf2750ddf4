//! Configuration validation

use crate::{AppConfig, ConfigError, Result};

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire application configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    if let Err(e) = validate_log_level(&config.service.log_level) {
        errors.push(e);
    }

    // Payment tunables
    if config.payment.currency.len() != 3
        || !config.payment.currency.chars().all(|c| c.is_ascii_uppercase())
    {
        errors.push(ValidationError::new(
            "payment.currency",
            "must be a 3-letter uppercase ISO currency code",
        ));
    }

    if config.payment.poll_interval_secs == 0 {
        errors.push(ValidationError::new(
            "payment.poll_interval_secs",
            "must be greater than 0",
        ));
    }

    if config.payment.max_poll_attempts == 0 {
        errors.push(ValidationError::new(
            "payment.max_poll_attempts",
            "must be greater than 0",
        ));
    }

    if !(4..=8).contains(&config.payment.otp_length) {
        errors.push(ValidationError::new(
            "payment.otp_length",
            "must be between 4 and 8 digits",
        ));
    }

    // Endpoints
    if config.wallet.endpoint.is_empty() {
        errors.push(ValidationError::new(
            "wallet.endpoint",
            "wallet endpoint is required",
        ));
    } else if let Err(e) = validate_url(&config.wallet.endpoint) {
        errors.push(ValidationError::new("wallet.endpoint", e));
    }

    if config.wallet.timeout_ms == 0 {
        errors.push(ValidationError::new(
            "wallet.timeout_ms",
            "must be greater than 0",
        ));
    }

    if config.gateway.endpoint.is_empty() {
        errors.push(ValidationError::new(
            "gateway.endpoint",
            "gateway endpoint is required",
        ));
    } else if let Err(e) = validate_url(&config.gateway.endpoint) {
        errors.push(ValidationError::new("gateway.endpoint", e));
    }

    if config.gateway.timeout_ms == 0 {
        errors.push(ValidationError::new(
            "gateway.timeout_ms",
            "must be greater than 0",
        ));
    }

    // Proof storage
    if config.proofs.key_prefix.is_empty() {
        errors.push(ValidationError::new(
            "proofs.key_prefix",
            "key prefix is required",
        ));
    }

    if config.proofs.max_image_bytes == 0 {
        errors.push(ValidationError::new(
            "proofs.max_image_bytes",
            "must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        let summary = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::ValidationError(summary))
    }
}

fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "service.log_level",
            format!("unknown log level: {level}"),
        )),
    }
}

fn validate_url(url: &str) -> std::result::Result<(), String> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(format!("invalid URL: {url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigLoader;

    fn valid_config() -> AppConfig {
        ConfigLoader::from_toml(
            r#"
            [wallet]
            endpoint = "http://localhost:8080"

            [gateway]
            endpoint = "https://momo.example.com"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_endpoints_rejected() {
        let config = AppConfig::default();
        let err = validate_config(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("wallet.endpoint"));
        assert!(message.contains("gateway.endpoint"));
    }

    #[test]
    fn test_bad_currency_rejected() {
        let mut config = valid_config();
        config.payment.currency = "xaf".to_string();
        assert!(validate_config(&config).is_err());

        config.payment.currency = "FRANCS".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_otp_length_bounds() {
        let mut config = valid_config();
        config.payment.otp_length = 3;
        assert!(validate_config(&config).is_err());

        config.payment.otp_length = 8;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_poll_budget_rejected() {
        let mut config = valid_config();
        config.payment.max_poll_attempts = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let mut config = valid_config();
        config.service.log_level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }
}
