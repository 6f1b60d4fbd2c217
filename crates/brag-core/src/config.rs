use crate::error::{BragError, Result};
use crate::paths;
use crate::types::{Seniority, Wording};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MIN_TIMEOUT_SECS: u64 = 5;
pub const MAX_TIMEOUT_SECS: u64 = 120;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ProfileConfig
// ---------------------------------------------------------------------------

/// Default modes used when a request doesn't name one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub seniority: Seniority,
    #[serde(default)]
    pub wording: Wording,
}

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationBackend {
    #[default]
    Ollama,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub backend: GenerationBackend,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_single_max_tokens")]
    pub single_max_tokens: u32,
}

fn default_endpoint() -> String {
    "http://localhost:11434/api/generate".to_string()
}

fn default_model() -> String {
    "llama3.1".to_string()
}

fn default_timeout_secs() -> u64 {
    45
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_single_max_tokens() -> u32 {
    600
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: GenerationBackend::default(),
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            single_max_tokens: default_single_max_tokens(),
        }
    }
}

impl GenerationConfig {
    /// Requests must never block indefinitely, nor time out before a local
    /// model can answer.
    pub fn effective_timeout_secs(&self) -> u64 {
        self.timeout_secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
    }
}

// ---------------------------------------------------------------------------
// BragConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BragConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for BragConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            profile: ProfileConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl BragConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(BragError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: BragConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let gen = &self.generation;

        if gen.backend == GenerationBackend::Ollama && gen.model.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "generation.model is empty; every request will fall back".to_string(),
            });
        }

        if gen.backend == GenerationBackend::Ollama && !gen.endpoint.starts_with("http") {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("generation.endpoint '{}' is not an http(s) URL", gen.endpoint),
            });
        }

        if !(0.0..=1.0).contains(&gen.temperature) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "generation.temperature={} is outside 0..=1; statements need low randomness",
                    gen.temperature
                ),
            });
        }

        if gen.effective_timeout_secs() != gen.timeout_secs {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "generation.timeout_secs={} clamped to {}",
                    gen.timeout_secs,
                    gen.effective_timeout_secs()
                ),
            });
        }

        if gen.max_tokens == 0 || gen.single_max_tokens == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "generation token budgets must be greater than zero".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
