use std::collections::HashMap;

use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CRITEO_FORWARDER__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
}

/// Submission endpoint profile. When `fixed_host` is set the regional
/// prefix is ignored and every event goes to that host.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_vendor_host")]
    pub vendor_host: String,
    #[serde(default)]
    pub fixed_host: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Bounded retry budget for a single event delivery.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

/// Country-to-region routing data. The built-in table covers the
/// common ISO codes; `overrides` wins over the table, and any country
/// not covered by either falls back to `default_region`.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub overrides: HashMap<String, String>,
    #[serde(default = "default_region")]
    pub default_region: String,
}

// Default functions
fn default_vendor_host() -> String {
    "widget.criteo.com".to_string()
}
fn default_user_agent() -> String {
    "criteo-forwarder/1.0.0".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_ms() -> u64 {
    5000
}
fn default_initial_backoff_ms() -> u64 {
    100
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_region() -> String {
    "us".to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            vendor_host: default_vendor_host(),
            fixed_host: None,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            overrides: HashMap::new(),
            default_region: default_region(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("CRITEO_FORWARDER")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
