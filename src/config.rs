//! Environment-driven gateway configuration.
//!
//! All values are read once at startup and immutable afterwards. `.env`
//! files are honored when the binary loads them before calling
//! [`GatewayConfig::from_env`].

use std::time::Duration;

use crate::catalog::SizeUnit;
use crate::models::ChatOptions;

/// Default client-facing listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8001";

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default readiness probe bound: 20 attempts, 500 ms apart.
pub const DEFAULT_PROBE_ATTEMPTS: u32 = 20;
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// Immutable gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Client-facing listen address.
    pub bind_addr: String,
    /// Base URL of the Ollama backend, no trailing slash.
    pub ollama_url: String,
    /// Sampling options forwarded with every chat call.
    pub chat_options: ChatOptions,
    /// Presentation unit for the `size` field of `/models`.
    pub size_unit: SizeUnit,
    /// Maximum readiness probe attempts.
    pub probe_attempts: u32,
    /// Delay between readiness probe attempts.
    pub probe_interval: Duration,
}

impl GatewayConfig {
    /// Read configuration from `CHATBRIDGE_*` environment variables,
    /// falling back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_or("CHATBRIDGE_BIND", DEFAULT_BIND_ADDR),
            ollama_url: normalize_base_url(&env_or("CHATBRIDGE_OLLAMA_URL", DEFAULT_OLLAMA_URL)),
            chat_options: ChatOptions::default(),
            size_unit: SizeUnit::parse(&env_or("CHATBRIDGE_SIZE_UNIT", "mb")),
            probe_attempts: env_parsed("CHATBRIDGE_PROBE_ATTEMPTS", DEFAULT_PROBE_ATTEMPTS),
            probe_interval: Duration::from_millis(env_parsed(
                "CHATBRIDGE_PROBE_INTERVAL_MS",
                DEFAULT_PROBE_INTERVAL.as_millis() as u64,
            )),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            chat_options: ChatOptions::default(),
            size_unit: SizeUnit::default(),
            probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            probe_interval: DEFAULT_PROBE_INTERVAL,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Strip trailing slashes so endpoint paths can be appended verbatim.
fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_local_ollama_setup() {
        let config = GatewayConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8001");
        assert_eq!(config.ollama_url, "http://localhost:11434");
        assert_eq!(config.probe_attempts, 20);
        assert_eq!(config.probe_interval, Duration::from_millis(500));
        assert_eq!(config.size_unit, SizeUnit::Megabytes);
    }

    #[test]
    fn base_url_loses_trailing_slashes() {
        assert_eq!(
            normalize_base_url("http://localhost:11434/"),
            "http://localhost:11434"
        );
        assert_eq!(
            normalize_base_url("http://localhost:11434"),
            "http://localhost:11434"
        );
    }
}
