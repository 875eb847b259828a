//! Configuration management for EnTrust services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// LLM provider behavior (timeouts, retries, mock mode)
    pub llm: LlmConfig,

    /// Report generation configuration
    pub report: ReportConfig,

    /// Artifact storage configuration
    pub storage: StorageConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Primary database URL (for writes)
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Per-call timeout in seconds. Generation calls run minutes, not ms.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Maximum retry attempts per provider call
    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,

    /// Consecutive failures before the per-purpose breaker opens
    #[serde(default = "default_breaker_threshold")]
    pub breaker_threshold: u32,

    /// Breaker cool-down in seconds
    #[serde(default = "default_breaker_cooldown")]
    pub breaker_cooldown_secs: u64,

    /// Approximate provider context window, in characters of prompt text.
    /// Survey payloads above this are chunked and summarized first.
    #[serde(default = "default_context_window")]
    pub context_window_chars: usize,

    /// Return canned text instead of calling providers (dev/test)
    #[serde(default)]
    pub mock: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Mean score below which a dimension is flagged as a risk area
    #[serde(default = "default_risk_threshold")]
    pub risk_threshold: f64,

    /// Standards passages retrieved per prompt
    #[serde(default = "default_rag_top_k")]
    pub rag_top_k: usize,

    /// Upper bound for a single dimension generation, in seconds
    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_secs: u64,

    /// Run the second critique pass when a critique config is active
    #[serde(default = "default_critique_enabled")]
    pub critique_enabled: bool,

    /// Max output tokens requested from the provider
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory for local artifacts (also the fallback target)
    #[serde(default = "default_local_root")]
    pub local_root: String,

    /// Signed URL lifetime in seconds
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_secs: u64,

    /// AWS region for S3-backed customers
    pub aws_region: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT secret for token signing
    pub jwt_secret: Option<String>,

    /// JWT expiration in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 50 }
fn default_min_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_llm_timeout() -> u64 { 300 }
fn default_llm_retries() -> u32 { 3 }
fn default_breaker_threshold() -> u32 { 5 }
fn default_breaker_cooldown() -> u64 { 60 }
fn default_context_window() -> usize { 24_000 }
fn default_risk_threshold() -> f64 { 5.0 }
fn default_rag_top_k() -> usize { 5 }
fn default_generation_timeout() -> u64 { 600 }
fn default_critique_enabled() -> bool { true }
fn default_max_output_tokens() -> u32 { 4096 }
fn default_local_root() -> String { "./reports".to_string() }
fn default_signed_url_ttl() -> u64 { 3600 }
fn default_jwt_expiration() -> u64 { 3600 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "entrust".to_string() }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get per-dimension generation timeout as Duration
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.report.generation_timeout_secs)
    }

    /// Get signed URL lifetime as Duration
    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.storage.signed_url_ttl_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
                shutdown_timeout_secs: default_shutdown_timeout(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/entrust".to_string(),
                read_url: None,
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            llm: LlmConfig {
                timeout_secs: default_llm_timeout(),
                max_retries: default_llm_retries(),
                breaker_threshold: default_breaker_threshold(),
                breaker_cooldown_secs: default_breaker_cooldown(),
                context_window_chars: default_context_window(),
                mock: false,
            },
            report: ReportConfig {
                risk_threshold: default_risk_threshold(),
                rag_top_k: default_rag_top_k(),
                generation_timeout_secs: default_generation_timeout(),
                critique_enabled: default_critique_enabled(),
                max_output_tokens: default_max_output_tokens(),
            },
            storage: StorageConfig {
                local_root: default_local_root(),
                signed_url_ttl_secs: default_signed_url_ttl(),
                aws_region: None,
            },
            auth: AuthConfig {
                jwt_secret: None,
                jwt_expiration_secs: default_jwt_expiration(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
            rate_limit: RateLimitConfig {
                requests_per_second: default_rate_limit(),
                burst: default_burst(),
                enabled: default_enabled(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.report.risk_threshold, 5.0);
        assert_eq!(config.report.rag_top_k, 5);
        assert!(!config.llm.mock);
    }

    #[test]
    fn test_read_database_fallback() {
        let config = AppConfig::default();
        assert_eq!(config.read_database_url(), "postgres://localhost/entrust");
    }

    #[test]
    fn test_signed_url_ttl_default_one_hour() {
        let config = AppConfig::default();
        assert_eq!(config.signed_url_ttl(), Duration::from_secs(3600));
    }
}
