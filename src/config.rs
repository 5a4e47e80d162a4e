//! Environment-driven configuration
//!
//! Loaded once at process start and passed down as constructed dependencies —
//! never a hidden global.

use std::time::Duration;

/// Log verbosity, mirrored onto a `tracing_subscriber` filter by the binary entrypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

/// Process-wide configuration, constructed once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the triplestore HTTP endpoint.
    pub triplestore_base_url: String,
    /// Default repository/dataset name within the triplestore.
    pub triplestore_repository: String,
    /// Concurrency cap for the triplestore request semaphore.
    pub triplestore_concurrency: usize,
    /// Per-call triplestore timeout.
    pub triplestore_timeout: Duration,
    /// Per-call LLM timeout.
    pub llm_timeout: Duration,
    /// Embedding vector dimension.
    pub vector_embedding_dimension: usize,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            triplestore_base_url: "http://localhost:3030".to_string(),
            triplestore_repository: "default".to_string(),
            triplestore_concurrency: 10,
            triplestore_timeout: Duration::from_secs(120),
            llm_timeout: Duration::from_secs(30),
            vector_embedding_dimension: 1536,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("TRIPLESTORE_BASE_URL") {
            config.triplestore_base_url = v;
        }
        if let Ok(v) = std::env::var("TRIPLESTORE_REPOSITORY") {
            config.triplestore_repository = v;
        }
        if let Ok(v) = std::env::var("TRIPLESTORE_CONCURRENCY") {
            if let Ok(n) = v.parse() {
                config.triplestore_concurrency = n;
            }
        }
        if let Ok(v) = std::env::var("TRIPLESTORE_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                config.triplestore_timeout = Duration::from_secs(n);
            }
        }
        if let Ok(v) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                config.llm_timeout = Duration::from_secs(n);
            }
        }
        if let Ok(v) = std::env::var("VECTOR_EMBEDDING_DIMENSION") {
            if let Ok(n) = v.parse() {
                config.vector_embedding_dimension = n;
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            if let Some(level) = LogLevel::parse(&v) {
                config.log_level = level;
            }
        }

        config
    }

    pub fn with_triplestore_concurrency(mut self, n: usize) -> Self {
        self.triplestore_concurrency = n;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::default();
        assert_eq!(config.triplestore_concurrency, 10);
        assert_eq!(config.triplestore_timeout, Duration::from_secs(120));
        assert_eq!(config.llm_timeout, Duration::from_secs(30));
    }

    #[test]
    fn log_level_parses_case_insensitively() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("bogus"), None);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = Config::default().with_triplestore_concurrency(4);
        assert_eq!(config.triplestore_concurrency, 4);
    }
}
