use crate::error::{Result, StudioError};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HISTORY_NAMESPACE: &str = "ai_studio_generations";
pub const DEFAULT_HISTORY_CAPACITY: usize = 5;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_DIMENSION: u32 = 1920;

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    pub failure_rate: f64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub endpoint: Option<String>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub namespace: String,
    pub storage_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PreparationConfig {
    pub max_file_size: u64,
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Default)]
pub struct StudioConfig {
    pub generation: GenerationConfig,
    pub history: HistoryConfig,
    pub preparation: PreparationConfig,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            min_latency_ms: 1000,
            max_latency_ms: 2000,
            failure_rate: 0.2,
            max_retries: 2,
            backoff_base_ms: 1000,
            endpoint: None,
            seed: None,
        }
    }
}

impl GenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        GenerationConfig {
            min_latency_ms: env_parse("STUDIO_MIN_LATENCY_MS").unwrap_or(defaults.min_latency_ms),
            max_latency_ms: env_parse("STUDIO_MAX_LATENCY_MS").unwrap_or(defaults.max_latency_ms),
            failure_rate: env_parse("STUDIO_FAILURE_RATE").unwrap_or(defaults.failure_rate),
            max_retries: env_parse("STUDIO_MAX_RETRIES").unwrap_or(defaults.max_retries),
            backoff_base_ms: env_parse("STUDIO_BACKOFF_BASE_MS")
                .unwrap_or(defaults.backoff_base_ms),
            endpoint: env::var("STUDIO_ENDPOINT").ok().filter(|s| !s.is_empty()),
            seed: env_parse("STUDIO_SEED"),
        }
    }

    pub fn with_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_latency_ms = min_ms;
        self.max_latency_ms = max_ms;
        self
    }

    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn min_latency(&self) -> Duration {
        Duration::from_millis(self.min_latency_ms)
    }

    pub fn max_latency(&self) -> Duration {
        Duration::from_millis(self.max_latency_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            capacity: DEFAULT_HISTORY_CAPACITY,
            namespace: DEFAULT_HISTORY_NAMESPACE.to_string(),
            storage_dir: None,
        }
    }
}

impl HistoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        HistoryConfig {
            capacity: env_parse("STUDIO_HISTORY_CAPACITY").unwrap_or(defaults.capacity),
            namespace: env::var("STUDIO_HISTORY_NAMESPACE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.namespace),
            storage_dir: env::var("STUDIO_HISTORY_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }
}

impl Default for PreparationConfig {
    fn default() -> Self {
        PreparationConfig {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_dimension: DEFAULT_MAX_DIMENSION,
            jpeg_quality: 80,
        }
    }
}

impl PreparationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        PreparationConfig {
            max_file_size: env_parse("STUDIO_MAX_FILE_SIZE").unwrap_or(defaults.max_file_size),
            max_dimension: env_parse("STUDIO_MAX_DIMENSION").unwrap_or(defaults.max_dimension),
            jpeg_quality: env_parse("STUDIO_JPEG_QUALITY").unwrap_or(defaults.jpeg_quality),
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_max_dimension(mut self, dimension: u32) -> Self {
        self.max_dimension = dimension;
        self
    }
}

impl StudioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        StudioConfig {
            generation: GenerationConfig::from_env(),
            history: HistoryConfig::from_env(),
            preparation: PreparationConfig::from_env(),
        }
    }

    pub fn with_generation(mut self, config: GenerationConfig) -> Self {
        self.generation = config;
        self
    }

    pub fn with_history(mut self, config: HistoryConfig) -> Self {
        self.history = config;
        self
    }

    pub fn with_preparation(mut self, config: PreparationConfig) -> Self {
        self.preparation = config;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let generation = &self.generation;
        if !(0.0..=1.0).contains(&generation.failure_rate) {
            return Err(StudioError::ConfigError(format!(
                "failure rate must be within [0, 1], got {}",
                generation.failure_rate
            )));
        }
        if generation.min_latency_ms > generation.max_latency_ms {
            return Err(StudioError::ConfigError(format!(
                "min latency {}ms exceeds max latency {}ms",
                generation.min_latency_ms, generation.max_latency_ms
            )));
        }
        if self.history.capacity == 0 {
            return Err(StudioError::ConfigError(
                "history capacity must be at least 1".into(),
            ));
        }
        if self.preparation.max_dimension == 0 {
            return Err(StudioError::ConfigError(
                "max image dimension must be at least 1".into(),
            ));
        }
        if !(1..=100).contains(&self.preparation.jpeg_quality) {
            return Err(StudioError::ConfigError(format!(
                "jpeg quality must be within 1..=100, got {}",
                self.preparation.jpeg_quality
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_KEYS: [&str; 6] = [
        "STUDIO_MAX_RETRIES",
        "STUDIO_FAILURE_RATE",
        "STUDIO_ENDPOINT",
        "STUDIO_HISTORY_CAPACITY",
        "STUDIO_HISTORY_NAMESPACE",
        "STUDIO_MAX_DIMENSION",
    ];

    #[test]
    fn test_env_parse_trims_and_rejects_garbage() {
        env::set_var("GENSTUDIO_TEST_PARSE_TRIMMED", " 0.5 ");
        env::set_var("GENSTUDIO_TEST_PARSE_GARBAGE", "lots");
        assert_eq!(env_parse::<f64>("GENSTUDIO_TEST_PARSE_TRIMMED"), Some(0.5));
        assert_eq!(env_parse::<u32>("GENSTUDIO_TEST_PARSE_GARBAGE"), None);
        assert_eq!(env_parse::<u32>("GENSTUDIO_TEST_PARSE_UNSET"), None);
        env::remove_var("GENSTUDIO_TEST_PARSE_TRIMMED");
        env::remove_var("GENSTUDIO_TEST_PARSE_GARBAGE");
    }

    // The only test that reads STUDIO_* variables, so nothing races on them.
    #[test]
    fn test_from_env_falls_back_on_unparseable_values() {
        let saved: Vec<_> = ENV_KEYS.iter().map(|key| (*key, env::var(key).ok())).collect();

        env::set_var("STUDIO_MAX_RETRIES", "lots");
        env::set_var("STUDIO_FAILURE_RATE", " 0.5 ");
        env::set_var("STUDIO_ENDPOINT", "");
        env::set_var("STUDIO_HISTORY_CAPACITY", "-3");
        env::set_var("STUDIO_HISTORY_NAMESPACE", "looks");
        env::set_var("STUDIO_MAX_DIMENSION", "1024");

        let config = StudioConfig::from_env();

        for (key, value) in saved {
            match value {
                Some(value) => env::set_var(key, value),
                None => env::remove_var(key),
            }
        }

        assert_eq!(config.generation.max_retries, 2);
        assert_eq!(config.generation.failure_rate, 0.5);
        assert_eq!(config.generation.endpoint, None);
        assert_eq!(config.history.capacity, 5);
        assert_eq!(config.history.namespace, "looks");
        assert_eq!(config.preparation.max_dimension, 1024);
    }

    #[test]
    fn test_defaults_match_studio_constants() {
        let config = StudioConfig::default();
        assert_eq!(config.generation.min_latency_ms, 1000);
        assert_eq!(config.generation.max_latency_ms, 2000);
        assert_eq!(config.generation.failure_rate, 0.2);
        assert_eq!(config.generation.max_retries, 2);
        assert_eq!(config.history.capacity, 5);
        assert_eq!(config.history.namespace, "ai_studio_generations");
        assert_eq!(config.preparation.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.preparation.max_dimension, 1920);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_rate =
            StudioConfig::new().with_generation(GenerationConfig::new().with_failure_rate(1.5));
        assert!(matches!(bad_rate.validate(), Err(StudioError::ConfigError(_))));

        let bad_latency =
            StudioConfig::new().with_generation(GenerationConfig::new().with_latency(500, 100));
        assert!(bad_latency.validate().is_err());

        let no_history = StudioConfig::new().with_history(HistoryConfig::new().with_capacity(0));
        assert!(no_history.validate().is_err());
    }
}
