use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{Result, WebgenError};

pub const CONFIG_FILE: &str = "config.json";
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub models: ModelConfig,
    pub output: OutputConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub key: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub plain: String,
    pub search: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            models: ModelConfig::default(),
            output: OutputConfig::default(),
            max_tokens: None,
            timeout_secs: 600,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            base_url: "https://openrouter.ai/api/v1".into(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            plain: "anthropic/claude-3.7-sonnet".into(),
            search: "anthropic/claude-3.7-sonnet:online".into(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { directory: "./webapp-output".into() }
    }
}

impl Config {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE)
    }

    /// Missing file yields defaults; a file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "configuration file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| WebgenError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| WebgenError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, json)?;
        Ok(())
    }

    /// Explicit value, then the environment, then the config file.
    pub fn resolve_api_key(&self, explicit: Option<&str>) -> Result<String> {
        let env = std::env::var(API_KEY_ENV).ok();
        resolve_key(explicit, env.as_deref(), &self.api.key)
    }

    pub fn set_api_key(&mut self, key: &str) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(WebgenError::Config("API key cannot be empty".into()));
        }
        if key.len() < 20 {
            return Err(WebgenError::Config("API key looks too short, check the key".into()));
        }
        self.api.key = key.to_string();
        Ok(())
    }

    pub fn set_output_dir(&mut self, dir: &str) -> Result<()> {
        let dir = dir.trim();
        if dir.is_empty() {
            return Err(WebgenError::Config("output directory cannot be empty".into()));
        }
        self.output.directory = dir.to_string();
        Ok(())
    }
}

fn resolve_key(explicit: Option<&str>, env: Option<&str>, file: &str) -> Result<String> {
    [explicit, env, Some(file)]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|k| !k.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            WebgenError::Authentication(format!(
                "no API key configured; pass --api-key, set {API_KEY_ENV}, or run `webgen config --api-key`"
            ))
        })
}

/// First and last four characters only.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    if chars.len() <= 8 {
        return "****".into();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
