//! Configuration for the unlock relay.

use anyhow::{bail, Context, Result};
use dhru_client::AuthPlacement;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Upstream provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Services cache / order log configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Resale pricing configuration
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Service list filtering
    #[serde(default)]
    pub services_filter: ServicesFilterConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Provider panel base URL, e.g. `https://gsm-imei.example`
    #[serde(default)]
    pub base_url: String,

    /// Reseller account username (or email, depending on deployment)
    #[serde(default)]
    pub username: String,

    /// Reseller API key
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout
    #[serde(with = "humantime_serde", default = "default_provider_timeout")]
    pub timeout: Duration,

    /// Where credentials go on widget-dialect calls
    #[serde(default = "default_auth_placement")]
    pub auth_placement: AuthPlacement,

    /// Panel session cookie for the `session_cookie` placement
    #[serde(default)]
    pub session_cookie: String,

    /// Widget path for service details
    #[serde(default = "default_service_details_path")]
    pub service_details_path: String,

    /// Query the provider for order status; when false, status is served
    /// from the local order log only
    #[serde(default = "default_true")]
    pub order_status_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Path to the JSON cache/log file
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,

    /// Enable persistence (if false, state is in-memory only)
    #[serde(default = "default_true")]
    pub persist: bool,

    /// How long a fetched service list stays fresh
    #[serde(with = "humantime_serde", default = "default_services_ttl")]
    pub services_ttl: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Margin applied to numeric service prices, in percent
    #[serde(default)]
    pub profit_margin_percent: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicesFilterConfig {
    /// Comma-separated service ids to expose exclusively
    #[serde(default)]
    pub allow: String,

    /// Comma-separated service ids to hide
    #[serde(default)]
    pub block: String,
}

impl ServicesFilterConfig {
    pub fn allow_ids(&self) -> Vec<String> {
        parse_csv(&self.allow)
    }

    pub fn block_ids(&self) -> Vec<String> {
        parse_csv(&self.block)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Global requests per minute
    #[serde(default = "default_global_rpm")]
    pub global_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn parse_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// Default implementations
impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            api_key: String::new(),
            timeout: default_provider_timeout(),
            auth_placement: default_auth_placement(),
            session_cookie: String::new(),
            service_details_path: default_service_details_path(),
            order_status_enabled: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            persist: true,
            services_ttl: default_services_ttl(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            profit_margin_percent: 0.0,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: default_global_rpm(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_provider_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_auth_placement() -> AuthPlacement {
    AuthPlacement::AuthorizationBearer
}

fn default_service_details_path() -> String {
    "/widget/getServicedetailsIMEI".into()
}

fn default_true() -> bool {
    true
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("data/relay-cache.json")
}

fn default_services_ttl() -> Duration {
    Duration::from_secs(3600)
}

fn default_global_rpm() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Require the provider credentials, naming every missing setting at
    /// once.
    fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.provider.base_url.is_empty() {
            missing.push("PROVIDER__BASE_URL");
        }
        if self.provider.username.is_empty() {
            missing.push("PROVIDER__USERNAME");
        }
        if self.provider.api_key.is_empty() {
            missing.push("PROVIDER__API_KEY");
        }
        if !missing.is_empty() {
            bail!(
                "missing required provider settings: {}",
                missing.join(", ")
            );
        }
        Ok(())
    }
}
