//! Profile configuration.
//!
//! Defines the YAML-serializable configuration naming the version of the
//! standard and the extension versions a profile combines.
//!
//! # Example YAML
//!
//! ```yaml
//! standard_version: "1__1__3"
//! registry_base_url: "https://raw.githubusercontent.com/open-contracting/extension_registry/master/"
//! language: en
//! extensions:
//!   ppp: v1.1.3
//!   location: v1.1.3
//! ```
//!
//! The order of `extensions` is the order in which schema patches are merged
//! and codelist additions/removals are concatenated.

use std::io::{BufReader, BufWriter};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, Result};

/// Registry used when the configuration does not override it.
pub const DEFAULT_REGISTRY_BASE_URL: &str =
    "https://raw.githubusercontent.com/open-contracting/extension_registry/master/";

fn default_language() -> String {
    "en".to_string()
}

/// Top-level profile configuration.
///
/// # Examples
///
/// ```
/// use ocds_profile_builder::ProfileConfig;
///
/// let config = ProfileConfig::new("1__1__3")
///     .with_extension("ppp", "v1.1.3")
///     .with_extension("location", "v1.1.3");
///
/// assert_eq!(config.extensions.keys().collect::<Vec<_>>(), ["ppp", "location"]);
/// assert_eq!(
///     config.registry_base_url(),
///     "https://raw.githubusercontent.com/open-contracting/extension_registry/master/"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Version of the standard, e.g. `1__1__3`.
    pub standard_version: String,
    /// Base URL of the extension registry; a pull request branch, for
    /// example, when working on a profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_base_url: Option<String>,
    /// Language of the extension names stamped on codelist rows.
    #[serde(default = "default_language")]
    pub language: String,
    /// Extension identifiers and versions, in registration order.
    #[serde(default)]
    pub extensions: IndexMap<String, String>,
}

impl ProfileConfig {
    /// Creates a configuration with no extensions.
    pub fn new(standard_version: impl Into<String>) -> Self {
        Self {
            standard_version: standard_version.into(),
            registry_base_url: None,
            language: default_language(),
            extensions: IndexMap::new(),
        }
    }

    /// Appends an extension version.
    pub fn with_extension(mut self, id: impl Into<String>, version: impl Into<String>) -> Self {
        self.extensions.insert(id.into(), version.into());
        self
    }

    /// Overrides the registry base URL.
    pub fn with_registry_base_url(mut self, url: impl Into<String>) -> Self {
        self.registry_base_url = Some(url.into());
        self
    }

    /// Returns the registry base URL, falling back to
    /// [`DEFAULT_REGISTRY_BASE_URL`].
    pub fn registry_base_url(&self) -> &str {
        self.registry_base_url
            .as_deref()
            .unwrap_or(DEFAULT_REGISTRY_BASE_URL)
    }

    /// Loads and validates configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::BuildError::IoError) if the file cannot be
    /// read, [`YamlError`](crate::BuildError::YamlError) if parsing fails, or
    /// [`InvalidConfig`](crate::BuildError::InvalidConfig) if validation
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::BuildError::IoError) if the file cannot be
    /// written, or [`YamlError`](crate::BuildError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks that no required value is empty.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](crate::BuildError::InvalidConfig) naming the
    /// first empty value.
    pub fn validate(&self) -> Result<()> {
        if self.standard_version.trim().is_empty() {
            return Err(BuildError::InvalidConfig(
                "standard_version cannot be empty".to_string(),
            ));
        }
        for (id, version) in &self.extensions {
            if id.trim().is_empty() {
                return Err(BuildError::InvalidConfig(
                    "extension identifier cannot be empty".to_string(),
                ));
            }
            if version.trim().is_empty() {
                return Err(BuildError::InvalidConfig(format!(
                    "version of extension {id} cannot be empty"
                )));
            }
        }
        Ok(())
    }
}
