//! # Controller Configuration
//!
//! Exporter-level settings loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

/// Exporter-level configuration
///
/// All settings have defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Interval between passes in continuous mode (seconds)
    pub sync_interval_secs: u64,
    /// Port of the metrics and probe server
    pub metrics_port: u16,
    /// Serve `/metrics`, `/healthz` and `/readyz`
    pub enable_metrics: bool,
    /// Log output format
    pub log_format: LogFormat,
    /// Lifetime of cached discovery mappings (seconds, 0 = never expire)
    pub discovery_cache_ttl_secs: u64,
    /// Objects requested per list page
    pub list_page_size: u32,
    /// Author name for synchronization commits
    pub commit_author_name: String,
    /// Author email for synchronization commits
    pub commit_author_email: String,
    /// Debounce window applied to configuration file events (milliseconds)
    pub config_reload_debounce_ms: u64,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            metrics_port: DEFAULT_METRICS_PORT,
            enable_metrics: true,
            log_format: LogFormat::Text,
            discovery_cache_ttl_secs: DEFAULT_DISCOVERY_CACHE_TTL_SECS,
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
            commit_author_name: DEFAULT_COMMIT_AUTHOR_NAME.to_string(),
            commit_author_email: DEFAULT_COMMIT_AUTHOR_EMAIL.to_string(),
            config_reload_debounce_ms: DEFAULT_CONFIG_RELOAD_DEBOUNCE_MS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Values that are present but unparsable fall back to their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let lookup = &lookup;
        Self {
            sync_interval_secs: parsed::<u64>(lookup, "SYNC_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.sync_interval_secs),
            metrics_port: parsed(lookup, "METRICS_PORT").unwrap_or(defaults.metrics_port),
            enable_metrics: lookup("ENABLE_METRICS")
                .map(|v| parse_bool(&v))
                .unwrap_or(defaults.enable_metrics),
            log_format: parsed(lookup, "LOG_FORMAT").unwrap_or(defaults.log_format),
            discovery_cache_ttl_secs: parsed(lookup, "DISCOVERY_CACHE_TTL_SECS")
                .unwrap_or(defaults.discovery_cache_ttl_secs),
            list_page_size: parsed::<u32>(lookup, "LIST_PAGE_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.list_page_size),
            commit_author_name: lookup("COMMIT_AUTHOR_NAME")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.commit_author_name),
            commit_author_email: lookup("COMMIT_AUTHOR_EMAIL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.commit_author_email),
            config_reload_debounce_ms: parsed(lookup, "CONFIG_RELOAD_DEBOUNCE_MS")
                .unwrap_or(defaults.config_reload_debounce_ms),
        }
    }

    /// Interval between passes in continuous mode
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// Discovery cache lifetime, `None` when mappings never expire
    pub fn discovery_cache_ttl(&self) -> Option<Duration> {
        (self.discovery_cache_ttl_secs > 0).then(|| Duration::from_secs(self.discovery_cache_ttl_secs))
    }

    /// Debounce window for configuration file events
    pub fn config_reload_debounce(&self) -> Duration {
        Duration::from_millis(self.config_reload_debounce_ms)
    }
}

/// Parse the trimmed value of `key`, `None` when absent or unparsable
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}

/// Interpret common truthy spellings
fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_empty() {
        let config = ControllerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.sync_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("SYNC_INTERVAL_SECS", "60"),
            ("METRICS_PORT", "9100"),
            ("ENABLE_METRICS", "off"),
            ("LOG_FORMAT", "JSON"),
            ("DISCOVERY_CACHE_TTL_SECS", "0"),
            ("COMMIT_AUTHOR_NAME", "audit-bot"),
            ("LIST_PAGE_SIZE", " 250 "),
            ("CONFIG_RELOAD_DEBOUNCE_MS", "1500"),
        ]));
        assert_eq!(config.sync_interval_secs, 60);
        assert_eq!(config.metrics_port, 9100);
        assert!(!config.enable_metrics);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.discovery_cache_ttl(), None);
        assert_eq!(config.commit_author_name, "audit-bot");
        assert_eq!(config.list_page_size, 250);
        assert_eq!(config.config_reload_debounce(), Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("SYNC_INTERVAL_SECS", "0"),
            ("METRICS_PORT", "not-a-port"),
            ("LOG_FORMAT", "xml"),
            ("LIST_PAGE_SIZE", "0"),
        ]));
        let defaults = ControllerConfig::default();
        assert_eq!(config.sync_interval_secs, defaults.sync_interval_secs);
        assert_eq!(config.metrics_port, defaults.metrics_port);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.list_page_size, defaults.list_page_size);
    }
}
