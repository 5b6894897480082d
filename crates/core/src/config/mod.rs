use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_text_timeout() -> u64 {
    60
}

fn default_image_timeout() -> u64 {
    30
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_text_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_image_base_url() -> String {
    "https://api.unsplash.com".to_string()
}

fn default_language() -> String {
    "German".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_text_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model_name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_text_timeout")]
    pub timeout: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_text_base_url(),
            model_name: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout: default_text_timeout(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImageConfig {
    /// Empty means no photo-search credential; lookups then resolve to
    /// deterministic placeholder URLs.
    #[serde(default)]
    pub access_key: String,
    #[serde(default = "default_image_base_url")]
    pub base_url: String,
    #[serde(default = "default_image_timeout")]
    pub timeout: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            base_url: default_image_base_url(),
            timeout: default_image_timeout(),
        }
    }
}

impl ImageConfig {
    pub fn has_credentials(&self) -> bool {
        !self.access_key.trim().is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BookDefaults {
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for BookDefaults {
    fn default() -> Self {
        Self {
            language: default_language(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PromptConfig {
    /// Directories whose TOML/YAML files override the built-in prompts.
    #[serde(default)]
    pub custom_directories: Vec<PathBuf>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub book: BookDefaults,
    #[serde(default)]
    pub prompts: PromptConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// Overlays credentials and model parameters from the environment.
    /// Unset variables leave the file values untouched; unparsable numeric
    /// values are ignored.
    pub fn apply_env(&mut self) {
        if let Ok(key) = env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                self.llm.api_key = key;
            }
        }
        if let Ok(model) = env::var("OPENAI_MODEL") {
            if !model.trim().is_empty() {
                self.llm.model_name = model;
            }
        }
        if let Some(max_tokens) = env::var("OPENAI_MAX_TOKENS")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
        {
            self.llm.max_tokens = max_tokens;
        }
        if let Some(temperature) = env::var("OPENAI_TEMPERATURE")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
        {
            self.llm.temperature = temperature;
        }
        if let Ok(key) = env::var("UNSPLASH_API_KEY") {
            if !key.trim().is_empty() {
                self.images.access_key = key;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    config: Config,
}

impl ConfigStore {
    /// Opens the store at `path`, falling back to defaults when the file
    /// does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = if path.exists() {
            Config::from_path(&path)?
        } else {
            Config::default()
        };
        Ok(Self { path, config })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.config.to_path(&self.path)
    }
}
