//! Engine configuration
//!
//! Names of the attributes and marker classes the projector reads and
//! writes. Everything has a default, so an empty TOML document is a valid
//! configuration.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Attribute names used on elements
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AttributeNames {
    /// Attribute holding the instruction list
    pub instruction: String,
    /// Prefix of the attributes that back up templated content. The text
    /// backup uses the prefix itself, attribute backups append `-{name}`.
    pub backup_prefix: String,
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            instruction: "z-var".to_string(),
            backup_prefix: "z-var-content".to_string(),
        }
    }
}

/// Marker classes set by the `toggle` action
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Markers {
    pub visible: String,
    pub hidden: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            visible: "z-template-visible".to_string(),
            hidden: "z-template-hidden".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub attributes: AttributeNames,
    pub markers: Markers,
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Set the instruction attribute name
    pub fn with_instruction_attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.instruction = name.into();
        self
    }

    /// Set the backup attribute prefix
    pub fn with_backup_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.attributes.backup_prefix = prefix.into();
        self
    }

    /// Set the toggle marker classes
    pub fn with_markers(mut self, visible: impl Into<String>, hidden: impl Into<String>) -> Self {
        self.markers.visible = visible.into();
        self.markers.hidden = hidden.into();
        self
    }

    /// Backup attribute for the text content (`param = None`) or an attribute
    pub fn backup_attribute(&self, param: Option<&str>) -> String {
        match param {
            Some(name) => format!("{}-{}", self.attributes.backup_prefix, name),
            None => self.attributes.backup_prefix.clone(),
        }
    }
}
