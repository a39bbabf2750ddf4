//! Core configuration structures for the sokoni service

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Service-wide configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Payment protocol configuration
    #[serde(default)]
    pub payment: PaymentSettings,

    /// Wallet service endpoint configuration
    #[serde(default)]
    pub wallet: WalletEndpointConfig,

    /// Mobile-money gateway endpoint configuration
    #[serde(default)]
    pub gateway: GatewayEndpointConfig,

    /// Proof image storage configuration
    #[serde(default)]
    pub proofs: ProofStorageConfig,
}

/// Service environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Environment type (production, staging, local)
    #[serde(default = "default_environment")]
    pub environment: Environment,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Local,
}

/// Payment protocol tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettings {
    /// ISO currency code for mobile-money transfers
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Pause between transfer status polls, in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Status poll attempt budget
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// One-time code length in digits
    #[serde(default = "default_otp_length")]
    pub otp_length: u32,
}

/// Wallet service endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletEndpointConfig {
    /// Wallet service base URL
    #[serde(default)]
    pub endpoint: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Mobile-money gateway endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEndpointConfig {
    /// Gateway base URL
    #[serde(default)]
    pub endpoint: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Proof image storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofStorageConfig {
    /// Key prefix for stored proof images
    #[serde(default = "default_proof_prefix")]
    pub key_prefix: String,

    /// Maximum accepted image size in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

// Default value functions
fn default_environment() -> Environment {
    Environment::Local
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_currency() -> String {
    "XAF".to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_max_poll_attempts() -> u32 {
    30 // 5 minutes at the default interval
}

fn default_otp_length() -> u32 {
    5
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_max_retries() -> u32 {
    3
}

fn default_proof_prefix() -> String {
    "proofs".to_string()
}

fn default_max_image_bytes() -> usize {
    5 * 1024 * 1024
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
        }
    }
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
            otp_length: default_otp_length(),
        }
    }
}

impl Default for WalletEndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for GatewayEndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for ProofStorageConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_proof_prefix(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}
