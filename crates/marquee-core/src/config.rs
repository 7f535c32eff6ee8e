//! Layered configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the global file
//! `~/.marquee/config.toml`, the local file `./.marqueerc`, the environment
//! (`MARQUEE_ENGINE`, `MARQUEE_MODEL`, `MARQUEE_MOCK_RESPONSE`), and finally
//! command-line flags applied by the caller. The Gemini API key is read from `GEMINI_API_KEY` by the model
//! adapter and is never stored here.

use crate::error::{ConfigError, ConfigResult};
use marquee_orchestrator::{NoPacing, Pacing, RandomPacing, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const ENGINE_ENV: &str = "MARQUEE_ENGINE";
pub const MODEL_ENV: &str = "MARQUEE_MODEL";
pub const MOCK_RESPONSE_ENV: &str = "MARQUEE_MOCK_RESPONSE";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarqueeConfig {
    /// Model engine (`gemini` or `mock`).
    #[serde(default)]
    pub engine: Option<String>,

    /// Model id passed to the engine.
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub log_level: Option<String>,

    /// Directory holding saved projects.
    #[serde(default)]
    pub store_dir: Option<PathBuf>,

    /// File whose contents the `mock` engine returns for every call.
    #[serde(default)]
    pub mock_response: Option<PathBuf>,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub pacing: PacingSettings,
}

/// `[retry]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub initial_delay_ms: Option<u64>,
    #[serde(default)]
    pub attempt_timeout_secs: Option<u64>,
}

/// `[pacing]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingSettings {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub min_ms: Option<u64>,
    #[serde(default)]
    pub max_ms: Option<u64>,
}

impl MarqueeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// `NotFound`, `Io`, or `Parse` depending on what went wrong.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file, creating parent directories.
    ///
    /// # Errors
    /// `Parse` if serialization fails, `Io` if writing fails.
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Io(format!("Failed to create directory: {}", e)))?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::Io(format!("Failed to write file: {}", e)))
    }

    /// `~/.marquee/config.toml`, or `./.marquee/config.toml` without a home directory.
    pub fn default_global_path() -> PathBuf {
        marquee_home().join("config.toml")
    }

    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".marqueerc")
    }

    /// Loads global then local configuration, then applies the environment.
    ///
    /// Missing files are skipped; unreadable ones are logged and skipped.
    pub fn discover_and_load() -> Self {
        let mut config = Self::default();

        for path in [Self::default_global_path(), Self::default_local_path()] {
            match Self::load_from_file(&path) {
                Ok(found) => {
                    debug!(path = %path.display(), "Loaded configuration");
                    config.merge(&found);
                }
                Err(ConfigError::NotFound(_)) => {}
                Err(e) => warn!(error = %e, "Ignoring configuration file"),
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Merge another configuration into this one. Set values in `other` win.
    pub fn merge(&mut self, other: &Self) {
        if let Some(ref engine) = other.engine {
            self.engine = Some(engine.clone());
        }
        if let Some(ref model) = other.model {
            self.model = Some(model.clone());
        }
        if let Some(ref log_level) = other.log_level {
            self.log_level = Some(log_level.clone());
        }
        if let Some(ref store_dir) = other.store_dir {
            self.store_dir = Some(store_dir.clone());
        }
        if let Some(ref mock_response) = other.mock_response {
            self.mock_response = Some(mock_response.clone());
        }

        let retry = &other.retry;
        self.retry.max_attempts = retry.max_attempts.or(self.retry.max_attempts);
        self.retry.initial_delay_ms = retry.initial_delay_ms.or(self.retry.initial_delay_ms);
        self.retry.attempt_timeout_secs = retry.attempt_timeout_secs.or(self.retry.attempt_timeout_secs);

        let pacing = &other.pacing;
        self.pacing.enabled = pacing.enabled.or(self.pacing.enabled);
        self.pacing.min_ms = pacing.min_ms.or(self.pacing.min_ms);
        self.pacing.max_ms = pacing.max_ms.or(self.pacing.max_ms);
    }

    /// Overrides engine, model and mock fixture from the environment.
    ///
    /// `lookup` stands in for `std::env::var` so callers and tests can supply
    /// their own source.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(engine) = lookup(ENGINE_ENV).filter(|v| !v.trim().is_empty()) {
            self.engine = Some(engine);
        }
        if let Some(model) = lookup(MODEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.model = Some(model);
        }
        if let Some(path) = lookup(MOCK_RESPONSE_ENV).filter(|v| !v.trim().is_empty()) {
            self.mock_response = Some(PathBuf::from(path));
        }
    }

    /// Reads the `mock` engine's fixture reply, if one is configured.
    ///
    /// # Errors
    /// `Io` if the configured file cannot be read.
    pub fn mock_reply(&self) -> ConfigResult<Option<String>> {
        self.mock_response
            .as_deref()
            .map(|path| {
                std::fs::read_to_string(path)
                    .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))
            })
            .transpose()
    }

    /// Directory for saved projects.
    pub fn store_dir(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(|| marquee_home().join("projects"))
    }

    /// Builds the retry policy described by `[retry]`.
    ///
    /// # Errors
    /// `InvalidValue` for a zero attempt count.
    pub fn retry_policy(&self) -> ConfigResult<RetryPolicy> {
        let mut policy = RetryPolicy::default();
        if let Some(max_attempts) = self.retry.max_attempts {
            if max_attempts == 0 {
                return Err(ConfigError::InvalidValue("retry.max_attempts must be at least 1".to_string()));
            }
            policy = policy.with_max_attempts(max_attempts);
        }
        if let Some(ms) = self.retry.initial_delay_ms {
            policy = policy.with_initial_delay(Duration::from_millis(ms));
        }
        if let Some(secs) = self.retry.attempt_timeout_secs.filter(|s| *s > 0) {
            policy = policy.with_attempt_timeout(Duration::from_secs(secs));
        }
        Ok(policy)
    }

    /// Builds the stage pacing described by `[pacing]`. Pacing is on by default.
    pub fn pacing(&self) -> Arc<dyn Pacing> {
        if self.pacing.enabled == Some(false) {
            return Arc::new(NoPacing);
        }
        let default = RandomPacing::default();
        match (self.pacing.min_ms, self.pacing.max_ms) {
            (None, None) => Arc::new(default),
            (min, max) => {
                let min = min.unwrap_or(0);
                let max = max.unwrap_or(min);
                Arc::new(RandomPacing::new(Duration::from_millis(min), Duration::from_millis(max)))
            }
        }
    }
}

fn marquee_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".marquee")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_file() {
        let config: MarqueeConfig = toml::from_str(
            r#"
            engine = "gemini"
            model = "gemini-2.5-pro"
            log_level = "debug"
            store_dir = "/tmp/marquee"

            [retry]
            max_attempts = 5
            initial_delay_ms = 250

            [pacing]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.as_deref(), Some("gemini"));
        assert_eq!(config.store_dir(), PathBuf::from("/tmp/marquee"));
        let policy = config.retry_policy().unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_millis(250));
        assert_eq!(policy.attempt_timeout, None);
    }

    #[test]
    fn test_local_overrides_global_field_by_field() {
        let mut config: MarqueeConfig =
            toml::from_str("engine = \"gemini\"\nmodel = \"a\"\n[retry]\nmax_attempts = 4\n").unwrap();
        let local: MarqueeConfig =
            toml::from_str("model = \"b\"\n[retry]\ninitial_delay_ms = 10\n").unwrap();

        config.merge(&local);

        assert_eq!(config.engine.as_deref(), Some("gemini"));
        assert_eq!(config.model.as_deref(), Some("b"));
        assert_eq!(config.retry.max_attempts, Some(4));
        assert_eq!(config.retry.initial_delay_ms, Some(10));
    }

    #[test]
    fn test_env_overrides_files() {
        let mut config = MarqueeConfig { engine: Some("gemini".to_string()), ..Default::default() };
        config.apply_env_overrides(|key| match key {
            ENGINE_ENV => Some("mock".to_string()),
            MODEL_ENV => Some("   ".to_string()),
            MOCK_RESPONSE_ENV => Some("reply.json".to_string()),
            _ => None,
        });
        assert_eq!(config.engine.as_deref(), Some("mock"));
        assert_eq!(config.model, None);
        assert_eq!(config.mock_response, Some(PathBuf::from("reply.json")));
    }

    #[test]
    fn test_mock_reply_reads_fixture() {
        let dir = TempDir::new().unwrap();
        let fixture = dir.path().join("reply.json");
        std::fs::write(&fixture, r#"{"personas": []}"#).unwrap();

        let mut config = MarqueeConfig::default();
        assert_eq!(config.mock_reply().unwrap(), None);

        config.mock_response = Some(fixture);
        assert_eq!(config.mock_reply().unwrap().as_deref(), Some(r#"{"personas": []}"#));

        config.mock_response = Some(dir.path().join("missing.json"));
        assert!(matches!(config.mock_reply(), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config: MarqueeConfig = toml::from_str("[retry]\nmax_attempts = 0\n").unwrap();
        assert!(matches!(config.retry_policy(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = MarqueeConfig {
            engine: Some("mock".to_string()),
            retry: RetrySettings { attempt_timeout_secs: Some(30), ..Default::default() },
            ..Default::default()
        };

        config.save_to_file(&path).unwrap();
        let loaded = MarqueeConfig::load_from_file(&path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.retry_policy().unwrap().attempt_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_missing_and_broken_files() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(MarqueeConfig::load_from_file(&missing), Err(ConfigError::NotFound(_))));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "engine = [").unwrap();
        assert!(matches!(MarqueeConfig::load_from_file(&broken), Err(ConfigError::Parse(_))));
    }
}
