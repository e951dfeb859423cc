use std::{io, path::Path};

use serde::{Deserialize, Serialize};

use crate::domain::{IdPrefix, error_id::InvalidPrefixError};

/// Configuration for extraction and message rendering.
///
/// This struct holds settings that control how extracted statements are turned
/// into identifiers and messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Versions", into = "Versions")]
pub struct Config {
    /// The URL of the published specification.
    ///
    /// Each message ends with a link to the section the statement was found
    /// in, formed as `{spec_url}#{anchor}`.
    spec_url: String,

    /// The text every message starts with, ahead of the quoted section
    /// heading.
    message_prefix: String,

    /// The prefix of every identifier.
    ///
    /// For example, `VALIDATION_ERROR` gives identifiers such as
    /// `VALIDATION_ERROR_12`.
    id_prefix: IdPrefix,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spec_url: default_spec_url(),
            message_prefix: default_message_prefix(),
            id_prefix: IdPrefix::default(),
        }
    }
}

/// Errors that can occur when loading or saving a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file: {0}")]
    Read(#[source] io::Error),
    /// The file is not valid TOML, or holds invalid values.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be serialized.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// The file could not be written.
    #[error("Failed to write config file: {0}")]
    Write(#[source] io::Error),
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Ok(toml::from_str(&content)?)
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(ConfigError::Write)
    }

    /// Returns the URL of the published specification.
    #[must_use]
    pub fn spec_url(&self) -> &str {
        &self.spec_url
    }

    /// Returns the text every message starts with.
    #[must_use]
    pub fn message_prefix(&self) -> &str {
        &self.message_prefix
    }

    /// Returns the identifier prefix.
    #[must_use]
    pub const fn id_prefix(&self) -> &IdPrefix {
        &self.id_prefix
    }

    /// Sets the URL of the published specification.
    pub fn set_spec_url(&mut self, spec_url: String) {
        self.spec_url = spec_url;
    }

    /// Sets the identifier prefix.
    pub fn set_id_prefix(&mut self, id_prefix: IdPrefix) {
        self.id_prefix = id_prefix;
    }
}

fn default_spec_url() -> String {
    "https://www.khronos.org/registry/vulkan/specs/1.0/xhtml/vkspec.html".to_string()
}

fn default_message_prefix() -> String {
    "For more information refer to Vulkan Spec Section".to_string()
}

fn default_id_prefix() -> String {
    IdPrefix::default().to_string()
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_spec_url")]
        spec_url: String,

        #[serde(default = "default_message_prefix")]
        message_prefix: String,

        /// Validated on conversion into [`Config`].
        #[serde(default = "default_id_prefix")]
        id_prefix: String,
    },
}

impl TryFrom<Versions> for Config {
    type Error = InvalidPrefixError;

    fn try_from(versions: Versions) -> Result<Self, Self::Error> {
        match versions {
            Versions::V1 {
                spec_url,
                message_prefix,
                id_prefix,
            } => Ok(Self {
                spec_url,
                message_prefix,
                id_prefix: IdPrefix::new(id_prefix)?,
            }),
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            spec_url: config.spec_url,
            message_prefix: config.message_prefix,
            id_prefix: config.id_prefix.to_string(),
        }
    }
}
