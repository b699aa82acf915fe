//! Configuration management for ATS-Oxide

use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Retry budget of element actions
    pub max_try: u32,

    /// Retry budget of the animation-settling wait
    pub max_try_interactable: u32,

    /// Delay between "not interactable" attempts, in milliseconds
    pub interactable_delay_ms: u64,

    /// Cool-down before reporting an exhausted retry loop, in milliseconds
    pub cooldown_ms: u64,

    /// Delay between two bounding rectangle samples, in milliseconds
    pub animation_sample_ms: u64,

    /// Step of the progressive click delay, in milliseconds
    pub progressive_step_ms: u64,

    /// Age after which the mobile read cache is refreshed, in milliseconds
    pub cache_ttl_ms: u64,

    /// HTTP connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// HTTP read timeout in seconds
    pub read_timeout_secs: u64,

    /// HTTP write timeout in seconds
    pub write_timeout_secs: u64,

    /// Client identity sent to mobile drivers
    pub user_agent: Option<String>,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_try: 20,
            max_try_interactable: 20,
            interactable_delay_ms: 300,
            cooldown_ms: 200,
            animation_sample_ms: 100,
            progressive_step_ms: 100,
            cache_ttl_ms: 2500,
            connect_timeout_secs: 30,
            read_timeout_secs: 40,
            write_timeout_secs: 30,
            user_agent: None,
            log_level: "info".to_string(),
        }
    }
}

/// Timing parameters shared by every retry loop of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTiming {
    pub max_try: u32,
    pub max_try_interactable: u32,
    pub interactable_delay: Duration,
    pub cooldown: Duration,
    pub animation_sample: Duration,
    pub progressive_step: Duration,
}

impl Default for RetryTiming {
    fn default() -> Self {
        Config::default().retry_timing()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Some(v) = parse_var("ATS_MAX_TRY")? {
            config.max_try = v;
        }

        if let Some(v) = parse_var("ATS_MAX_TRY_INTERACTABLE")? {
            config.max_try_interactable = v;
        }

        if let Some(v) = parse_var("ATS_INTERACTABLE_DELAY")? {
            config.interactable_delay_ms = v;
        }

        if let Some(v) = parse_var("ATS_COOLDOWN")? {
            config.cooldown_ms = v;
        }

        if let Some(v) = parse_var("ATS_ANIMATION_SAMPLE")? {
            config.animation_sample_ms = v;
        }

        if let Some(v) = parse_var("ATS_PROGRESSIVE_STEP")? {
            config.progressive_step_ms = v;
        }

        if let Some(v) = parse_var("ATS_CACHE_TTL")? {
            config.cache_ttl_ms = v;
        }

        if let Some(v) = parse_var("ATS_CONNECT_TIMEOUT")? {
            config.connect_timeout_secs = v;
        }

        if let Some(v) = parse_var("ATS_READ_TIMEOUT")? {
            config.read_timeout_secs = v;
        }

        if let Some(v) = parse_var("ATS_WRITE_TIMEOUT")? {
            config.write_timeout_secs = v;
        }

        if let Ok(agent) = env::var("ATS_USER_AGENT") {
            config.user_agent = Some(agent);
        }

        if let Ok(log_level) = env::var("ATS_LOG_LEVEL") {
            config.log_level = log_level;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Retry timing derived from this configuration
    pub fn retry_timing(&self) -> RetryTiming {
        RetryTiming {
            max_try: self.max_try,
            max_try_interactable: self.max_try_interactable,
            interactable_delay: Duration::from_millis(self.interactable_delay_ms),
            cooldown: Duration::from_millis(self.cooldown_ms),
            animation_sample: Duration::from_millis(self.animation_sample_ms),
            progressive_step: Duration::from_millis(self.progressive_step_ms),
        }
    }

    /// Client identity header value for mobile drivers
    pub fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(|| {
            let user = env::var("USER")
                .or_else(|_| env::var("USERNAME"))
                .unwrap_or_default();
            format!("AtsMobileDriver/{},{},", crate::VERSION, user)
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::configuration(format!("Invalid {}", name))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_try, 20);
        assert_eq!(config.cache_ttl(), Duration::from_millis(2500));

        let timing = config.retry_timing();
        assert_eq!(timing.interactable_delay, Duration::from_millis(300));
        assert_eq!(timing.cooldown, Duration::from_millis(200));
        assert_eq!(timing.animation_sample, Duration::from_millis(100));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_try = 5\ncache_ttl_ms = 100").unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.max_try, 5);
        assert_eq!(config.cache_ttl_ms, 100);
        // untouched fields keep their defaults
        assert_eq!(config.interactable_delay_ms, 300);
    }

    #[test]
    fn test_from_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_try = \"many\"").unwrap();

        let result = Config::from_file(file.path().to_str().unwrap());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_user_agent_override() {
        let config = Config {
            user_agent: Some("probe/1".to_string()),
            ..Default::default()
        };
        assert_eq!(config.user_agent(), "probe/1");
        assert!(Config::default().user_agent().starts_with("AtsMobileDriver/"));
    }
}
