//! Runtime configuration

use crate::retry::RetryConfig;
use std::net::SocketAddr;
use std::time::Duration;

/// Identifying user agent sent with every outbound request
pub const USER_AGENT: &str = concat!(
    "wordpress-fingerprint/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/robdotec/wordpress-fingerprint)"
);

/// WordPress.org API base URL
pub const DEFAULT_REGISTRY_URL: &str = "https://api.wordpress.org";

/// Latest WordPress release known at build time
pub const DEFAULT_CORE_BASELINE: &str = "6.8.3";

/// OpenAI-compatible chat completions endpoint
pub const DEFAULT_LLM_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default completion model
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Request timeout in seconds
const TIMEOUT_SECS: u64 = 30;

/// Top-level service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server listens on
    pub bind: SocketAddr,
    /// Fingerprinting settings
    pub scan: ScanConfig,
    /// Security summary settings
    pub summary: SummaryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            scan: ScanConfig::default(),
            summary: SummaryConfig::default(),
        }
    }
}

/// Settings for the fingerprinting pipeline
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Allow scanning private/internal IP addresses
    pub allow_private: bool,
    /// Plugin/theme registry base URL
    pub registry_url: String,
    /// Fixed "latest known" WordPress version core installs are compared against
    pub core_baseline: String,
    /// Maximum number of in-flight probe or registry requests per phase
    pub probe_concurrency: usize,
    /// Per-request timeout
    pub timeout: Duration,
    /// User agent for outbound requests
    pub user_agent: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            allow_private: false,
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            core_baseline: DEFAULT_CORE_BASELINE.to_string(),
            probe_concurrency: 8,
            timeout: Duration::from_secs(TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Settings for the language-model summary
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    /// Chat completions endpoint
    pub api_url: String,
    /// Bearer token; the analysis endpoint fails without one
    pub api_key: Option<String>,
    /// Model name
    pub model: String,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_LLM_URL.to_string(),
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            retry: RetryConfig::default(),
        }
    }
}
