use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::constants::{
    DEFAULT_API_KEY_ENV, DEFAULT_BATCH_DELAY_MS, DEFAULT_BATCH_SIZE, DEFAULT_CONFIG_PATH,
    DEFAULT_ENDPOINT, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_OUTPUT_DIR, DEFAULT_TEMPERATURE,
};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub classifier: ClassifierConfig,
    pub labeling: LabelingConfig,
    pub output: OutputConfig,
}

/// Settings for the chat-completion request sent per batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    pub batch_size: usize,
    /// Strict prefix cap on the rows sent for labeling. `0` or unset means no cap.
    pub max_reviews: Option<usize>,
    /// Pause after every batch, successful or not.
    pub batch_delay_ms: u64,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_reviews: None,
            batch_delay_ms: DEFAULT_BATCH_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: DEFAULT_OUTPUT_DIR.to_string(),
        }
    }
}

impl Config {
    /// Load from an explicit path, or from `config.toml` when it exists.
    ///
    /// A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_from(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.labeling.batch_size == 0 {
            return Err(PipelineError::Config(
                "labeling.batch_size must be at least 1".to_string(),
            ));
        }
        if !self.classifier.temperature.is_finite() || self.classifier.temperature < 0.0 {
            return Err(PipelineError::Config(format!(
                "classifier.temperature must be a non-negative number, got {}",
                self.classifier.temperature
            )));
        }
        if self.classifier.endpoint.trim().is_empty() {
            return Err(PipelineError::Config("classifier.endpoint is empty".to_string()));
        }
        if self.classifier.model.trim().is_empty() {
            return Err(PipelineError::Config("classifier.model is empty".to_string()));
        }
        Ok(())
    }

    /// Read the bearer token named by `classifier.api_key_env`.
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.classifier.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            Ok(_) | Err(std::env::VarError::NotPresent) => Err(
                PipelineError::MissingCredential(self.classifier.api_key_env.clone()),
            ),
            Err(e) => Err(e.into()),
        }
    }
}
