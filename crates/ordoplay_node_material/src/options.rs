// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compile options, loadable from RON files.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Float precision declared at the top of fragment shaders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloatPrecision {
    /// `lowp`
    Low,
    /// `mediump`
    Medium,
    /// `highp`
    #[default]
    High,
}

impl FloatPrecision {
    /// GLSL qualifier
    pub fn qualifier(self) -> &'static str {
        match self {
            Self::Low => "lowp",
            Self::Medium => "mediump",
            Self::High => "highp",
        }
    }
}

/// Options controlling code generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMaterialOptions {
    /// Write section and block comments into the generated source
    pub emit_comments: bool,
    /// Fragment shader float precision
    pub fragment_precision: FloatPrecision,
}

impl NodeMaterialOptions {
    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, OptionsError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, OptionsError> {
        Ok(ron::from_str(s)?)
    }

    /// Load options from a file
    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let content = std::fs::read_to_string(path)?;
        let options = Self::from_ron(&content)?;
        tracing::debug!("Loaded material options from {}", path.display());
        Ok(options)
    }

    /// Save options to a file
    pub fn save(&self, path: &Path) -> Result<(), OptionsError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

/// Error when reading or writing options
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RON input
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),
}
