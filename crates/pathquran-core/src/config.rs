use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::provider::Provider;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub ollama_url: Option<String>,
    pub data_dir: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::Groq.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(Provider::from_str)
            .unwrap_or(Provider::Groq)
    }

    /// Switch provider by name. A model chosen for the previous provider is
    /// dropped so the new provider's default applies.
    pub fn set_provider(&mut self, name: &str) -> Result<()> {
        let provider = Provider::from_str(name).ok_or_else(|| {
            anyhow!("Unknown provider '{}' (expected groq, openai or ollama)", name)
        })?;
        if provider != self.provider() {
            self.default_model = None;
        }
        self.provider = Some(provider.as_str().to_string());
        Ok(())
    }

    pub fn model(&self) -> String {
        self.default_model
            .clone()
            .unwrap_or_else(|| self.provider().default_model().to_string())
    }

    /// API key for a hosted provider. Environment variables win over the
    /// config file.
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        let (env_var, configured) = match provider {
            Provider::Groq => ("GROQ_API_KEY", &self.groq_api_key),
            Provider::OpenAI => ("OPENAI_API_KEY", &self.openai_api_key),
            Provider::Ollama => return None,
        };
        std::env::var(env_var)
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| configured.clone())
    }

    pub fn ollama_url(&self) -> &str {
        self.ollama_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL)
    }

    /// Where the bundled text tables live: explicit override, then the
    /// config file, then `./data`, then `<config dir>/data`.
    pub fn resolve_data_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = override_dir {
            return Ok(dir.to_path_buf());
        }
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }

        let local = PathBuf::from("data");
        if local.join(crate::corpus::CHAPTER_NAMES_FILE).exists() {
            return Ok(local);
        }

        Ok(config_dir()?.join("data"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.json"))
    }
}

/// `<platform config dir>/pathquran`
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
    Ok(base.join("pathquran"))
}
