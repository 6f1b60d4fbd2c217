//! Client for the external text-generation capability.
//!
//! The generator only depends on [`TextGenerator`]; the concrete backend is
//! picked from config. Every failure is a [`GenerationError`], which callers
//! convert to fallback rather than propagate.

use crate::config::{GenerationBackend, GenerationConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("text generation unavailable: {0}")]
    Unavailable(String),

    #[error("text generation timed out after {0}s")]
    Timeout(u64),

    #[error("malformed generation output: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 2000,
            system_prompt: None,
        }
    }
}

pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, GenerationError>;

    /// Short label for logs and `--json` output.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Ollama
// ---------------------------------------------------------------------------

/// Talks to an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaGenerator {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

impl OllamaGenerator {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GenerationError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            timeout_secs,
        })
    }

    fn classify(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.timeout_secs)
        } else {
            GenerationError::Unavailable(err.to_string())
        }
    }
}

impl TextGenerator for OllamaGenerator {
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, GenerationError> {
        let body = OllamaRequest {
            model: &self.model,
            prompt,
            system: options.system_prompt.as_deref(),
            stream: false,
            options: OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
            },
        };
        debug!(endpoint = %self.endpoint, model = %self.model, "sending generation request");
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| self.classify(e))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(GenerationError::Unavailable(format!(
                "server returned {}: {}",
                status.as_u16(),
                text.trim()
            )));
        }
        let parsed: OllamaResponse = resp
            .json()
            .map_err(|e| if e.is_timeout() {
                GenerationError::Timeout(self.timeout_secs)
            } else {
                GenerationError::Malformed(e.to_string())
            })?;
        if parsed.response.trim().is_empty() {
            return Err(GenerationError::Malformed("empty response".into()));
        }
        Ok(parsed.response)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

// ---------------------------------------------------------------------------
// Disabled
// ---------------------------------------------------------------------------

/// Offline mode: every request is unavailable, so callers always fall back.
pub struct DisabledGenerator;

impl TextGenerator for DisabledGenerator {
    fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<String, GenerationError> {
        Err(GenerationError::Unavailable("text generation is disabled".into()))
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

pub fn generator_from_config(config: &GenerationConfig) -> Arc<dyn TextGenerator> {
    match config.backend {
        GenerationBackend::Disabled => Arc::new(DisabledGenerator),
        GenerationBackend::Ollama => {
            match OllamaGenerator::new(&config.endpoint, &config.model, config.effective_timeout_secs()) {
                Ok(g) => Arc::new(g),
                Err(e) => {
                    tracing::warn!(error = %e, "could not build generation client; running offline");
                    Arc::new(DisabledGenerator)
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scripted generator (tests)
// ---------------------------------------------------------------------------

/// Replays canned replies in order and records every prompt it was given.
/// Once the script runs out, every call is `Unavailable`.
#[cfg(test)]
pub(crate) struct ScriptedGenerator {
    replies: std::sync::Mutex<std::collections::VecDeque<Result<String, GenerationError>>>,
    prompts: std::sync::Mutex<Vec<(String, GenerationOptions)>>,
}

#[cfg(test)]
impl ScriptedGenerator {
    pub(crate) fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.into()),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub(crate) fn last_prompt(&self) -> Option<(String, GenerationOptions)> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[cfg(test)]
impl TextGenerator for ScriptedGenerator {
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, GenerationError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), options.clone()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Unavailable("script exhausted".into())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
