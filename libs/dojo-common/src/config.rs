// Process configuration, read once from the environment at startup

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("Invalid value '{value}' for {name}: {reason}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub piston_url: String,
    pub execution_timeout: Duration,
    pub grading_timeout: Duration,
    pub max_parallel_tests: usize,
    pub redis_url: Option<String>,
    pub bind_addr: String,
    pub challenges_path: PathBuf,
    pub languages_path: PathBuf,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window: Duration,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            piston_url: "http://localhost:2000".to_string(),
            execution_timeout: Duration::from_millis(10_000),
            grading_timeout: Duration::from_millis(60_000),
            max_parallel_tests: 1,
            redis_url: None,
            bind_addr: "0.0.0.0:3000".to_string(),
            challenges_path: PathBuf::from("config/challenges.json"),
            languages_path: PathBuf::from("config/languages.json"),
            rate_limit_max_requests: 10,
            rate_limit_window: Duration::from_secs(60),
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup; unset variables keep defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let max_parallel_tests: usize =
            parse_or(&get("MAX_PARALLEL_TESTS"), "MAX_PARALLEL_TESTS", defaults.max_parallel_tests)?;
        if max_parallel_tests == 0 {
            return Err(ConfigError {
                name: "MAX_PARALLEL_TESTS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let log_format = match get("LOG_FORMAT").map(|v| v.to_lowercase()) {
            None => defaults.log_format,
            Some(v) if v == "text" => LogFormat::Text,
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) => {
                return Err(ConfigError {
                    name: "LOG_FORMAT",
                    value: v,
                    reason: "expected 'text' or 'json'".to_string(),
                })
            }
        };

        Ok(Self {
            piston_url: get("PISTON_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.piston_url),
            execution_timeout: Duration::from_millis(parse_or(
                &get("EXECUTION_TIMEOUT_MS"),
                "EXECUTION_TIMEOUT_MS",
                defaults.execution_timeout.as_millis() as u64,
            )?),
            grading_timeout: Duration::from_millis(parse_or(
                &get("GRADING_TIMEOUT_MS"),
                "GRADING_TIMEOUT_MS",
                defaults.grading_timeout.as_millis() as u64,
            )?),
            max_parallel_tests,
            redis_url: get("REDIS_URL"),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            challenges_path: get("CHALLENGES_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.challenges_path),
            languages_path: get("LANGUAGES_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.languages_path),
            rate_limit_max_requests: parse_or(
                &get("RATE_LIMIT_MAX_REQUESTS"),
                "RATE_LIMIT_MAX_REQUESTS",
                defaults.rate_limit_max_requests,
            )?,
            rate_limit_window: Duration::from_secs(parse_or(
                &get("RATE_LIMIT_WINDOW_SECS"),
                "RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limit_window.as_secs(),
            )?),
            log_format,
        })
    }
}

fn parse_or<T>(raw: &Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError {
            name,
            value: value.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.piston_url, "http://localhost:2000");
        assert_eq!(config.max_parallel_tests, 1);
        assert_eq!(config.redis_url, None);
        assert_eq!(config.rate_limit_max_requests, 10);
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PISTON_URL", "http://piston:2000/"),
            ("EXECUTION_TIMEOUT_MS", "2500"),
            ("MAX_PARALLEL_TESTS", "4"),
            ("REDIS_URL", "redis://cache:6379"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(config.piston_url, "http://piston:2000");
        assert_eq!(config.execution_timeout, Duration::from_millis(2500));
        assert_eq!(config.max_parallel_tests, 4);
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup(&[("REDIS_URL", "  ")])).unwrap();
        assert_eq!(config.redis_url, None);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = Config::from_lookup(lookup(&[("GRADING_TIMEOUT_MS", "soon")])).unwrap_err();
        assert_eq!(err.name, "GRADING_TIMEOUT_MS");

        let err = Config::from_lookup(lookup(&[("MAX_PARALLEL_TESTS", "0")])).unwrap_err();
        assert_eq!(err.name, "MAX_PARALLEL_TESTS");
    }
}
