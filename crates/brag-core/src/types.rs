use crate::error::BragError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Seniority
// ---------------------------------------------------------------------------

/// How much organizational scope a statement may claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seniority {
    #[default]
    Ic,
    Senior,
    Lead,
}

impl Seniority {
    pub fn all() -> &'static [Seniority] {
        &[Seniority::Ic, Seniority::Senior, Seniority::Lead]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Seniority::Ic => "ic",
            Seniority::Senior => "senior",
            Seniority::Lead => "lead",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Seniority::Ic => "individual contributor",
            Seniority::Senior => "senior",
            Seniority::Lead => "lead",
        }
    }
}

impl fmt::Display for Seniority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Seniority {
    type Err = BragError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ic" | "individual_contributor" | "individual-contributor" => Ok(Seniority::Ic),
            "senior" => Ok(Seniority::Senior),
            "lead" => Ok(Seniority::Lead),
            _ => Err(BragError::InvalidMode(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Wording
// ---------------------------------------------------------------------------

/// Assertiveness of the phrasing. Never changes factual content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wording {
    #[default]
    Safe,
    Ambitious,
}

impl Wording {
    pub fn as_str(self) -> &'static str {
        match self {
            Wording::Safe => "safe",
            Wording::Ambitious => "ambitious",
        }
    }
}

impl fmt::Display for Wording {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Wording {
    type Err = BragError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(Wording::Safe),
            "ambitious" => Ok(Wording::Ambitious),
            _ => Err(BragError::InvalidMode(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }

    /// Lenient parse used on model output; unknown values yield `None`.
    pub fn parse_loose(s: &str) -> Option<Confidence> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" | "med" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// GenerationSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationSource {
    Model,
    Fallback,
}

impl GenerationSource {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationSource::Model => "model",
            GenerationSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for GenerationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
