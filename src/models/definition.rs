//! Workflow definition document (GitHub Actions YAML).
//!
//! Only the parts needed for correlation are modelled; unknown keys are ignored.

use indexmap::IndexMap;
use serde::Deserialize;

/// Parsed workflow file. Jobs keep document order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefinitionDoc {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub jobs: IndexMap<String, JobDef>,
}

/// A job entry keyed by its job ID.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobDef {
    /// Display name, when the workflow sets one.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepDef>,
}

/// A step entry; unnamed steps are kept but never match by name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepDef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub run: Option<String>,
    #[serde(default)]
    pub uses: Option<String>,
}

impl DefinitionDoc {
    /// Parse definition text. Empty text yields an empty document.
    pub fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}
