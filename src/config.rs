use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::{AsRefStr, Display, EnumString};

use crate::prompts;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const BASE_URL_ENV: &str = "TOWNHALL_BASE_URL";
pub const MODEL_ENV: &str = "TOWNHALL_MODEL";

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion service settings
    pub completion: CompletionConfig,

    /// UI preferences
    pub ui: UiConfig,

    /// Persona display metadata
    pub persona: PersonaDisplay,
}

/// Completion service configuration
///
/// The credential itself never lives here: only the name of the environment
/// variable it is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub api_key_env: String,
}

/// UI configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: Theme,
    pub density: Density,
}

/// Color theme of the chat view
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Vertical spacing of the chat view
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Density {
    #[default]
    Comfortable,
    Compact,
}

/// Who the user is talking to, as shown in the header and message bubbles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaDisplay {
    pub display_name: String,
    pub tagline: String,
    pub placeholder: String,
    pub hint: String,
    pub suggestions: Vec<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl Default for PersonaDisplay {
    fn default() -> Self {
        Self {
            display_name: prompts::PERSONA_NAME.to_string(),
            tagline: prompts::PERSONA_TAGLINE.to_string(),
            placeholder: prompts::COMPOSER_PLACEHOLDER.to_string(),
            hint: prompts::EMPTY_STATE_HINT.to_string(),
            suggestions: prompts::SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    /// Townhall home directory (`~/.townhall`)
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".townhall"))
    }

    /// Default location of the config file
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load configuration from `path` (or the default location), then apply
    /// environment overrides. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))?
        } else {
            Config::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Save configuration to file, creating the parent directory if needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Apply `TOWNHALL_BASE_URL` / `TOWNHALL_MODEL` style overrides.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.completion.base_url = base_url;
        }
        if let Some(model) = lookup(MODEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.completion.model = model;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let completion = &self.completion;
        if completion.base_url.trim().is_empty() {
            bail!("completion.base_url must not be empty");
        }
        if completion.model.trim().is_empty() {
            bail!("completion.model must not be empty");
        }
        if completion.max_tokens == 0 {
            bail!("completion.max_tokens must be greater than zero");
        }
        if !(0.0..=2.0).contains(&completion.temperature) {
            bail!(
                "completion.temperature must be between 0 and 2, got {}",
                completion.temperature
            );
        }
        if completion.api_key_env.trim().is_empty() {
            bail!("completion.api_key_env must name an environment variable");
        }
        if self.persona.suggestions.is_empty() {
            bail!("persona.suggestions must list at least one question");
        }
        Ok(())
    }

    /// Get API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        self.api_key_from(|name| std::env::var(name).ok())
    }

    pub fn api_key_from<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.completion.api_key_env).filter(|key| !key.trim().is_empty())
    }
}
