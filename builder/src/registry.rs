//! The extension registry and extension descriptors.
//!
//! The registry is a CSV file (`extension_versions.csv`) listing, for every
//! released version of every extension, where its files live. Each
//! extension's own `extension.json` adds metadata: a display name per
//! language and the codelists it ships.
//!
//! # Example
//!
//! ```
//! use ocds_profile_builder::ExtensionRegistry;
//!
//! let csv = "Id,Date,Version,Base URL,Download URL
//! location,2018-02-01,v1.1.3,https://raw.githubusercontent.com/open-contracting/ocds_location_extension/v1.1.3/,https://api.github.com/repos/open-contracting/ocds_location_extension/zipball/v1.1.3
//! ";
//! let registry = ExtensionRegistry::from_csv(csv).unwrap();
//! let location = registry.get("location", "v1.1.3").unwrap();
//! assert_eq!(location.date, "2018-02-01");
//! assert!(registry.get("location", "v9").is_err());
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{BuildError, Result};
use crate::source::ContentSource;

/// Name of the registry file under the registry base URL.
pub const REGISTRY_FILE: &str = "extension_versions.csv";

/// Returns the URL of the registry file under `base_url`.
pub fn registry_url(base_url: &str) -> String {
    format!("{base_url}{REGISTRY_FILE}")
}

/// Metadata from an extension's `extension.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionMetadata {
    /// Display name by language code.
    #[serde(default, deserialize_with = "localized")]
    pub name: IndexMap<String, String>,
    /// Description by language code.
    #[serde(default, deserialize_with = "localized")]
    pub description: IndexMap<String, String>,
    /// Codelist filenames under `codelists/`, possibly prefixed `+`/`-`.
    #[serde(default)]
    pub codelists: Vec<String>,
    /// Minor versions of the standard the extension is compatible with.
    #[serde(default)]
    pub compatibility: Vec<String>,
}

/// Accepts either a plain string (older extensions) or a language map.
fn localized<'de, D>(deserializer: D) -> std::result::Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Localized {
        Text(String),
        ByLanguage(IndexMap<String, String>),
    }

    Ok(match Localized::deserialize(deserializer)? {
        Localized::Text(text) => IndexMap::from([("en".to_string(), text)]),
        Localized::ByLanguage(map) => map,
    })
}

impl ExtensionMetadata {
    /// Parses `extension.json`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::JsonError`] if the document is malformed.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// One version of one extension, as listed in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionVersion {
    pub id: String,
    pub date: String,
    pub version: String,
    /// URL under which the extension's files can be fetched individually.
    pub base_url: String,
    /// URL of an archive of the extension.
    pub download_url: String,
    /// Metadata from `extension.json`, once fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExtensionMetadata>,
}

impl ExtensionVersion {
    /// Returns the URL of `filename` under the extension's base URL.
    pub fn url(&self, filename: &str) -> String {
        format!("{}{}", self.base_url, filename)
    }

    /// Fetches `filename` from the extension's base URL.
    ///
    /// # Errors
    ///
    /// Returns whatever `source` returns for a missing or unreadable file.
    pub fn remote(&self, filename: &str, source: &dyn ContentSource) -> Result<String> {
        source.fetch(&self.url(filename))
    }

    /// Returns the display name in `language`, falling back to English and
    /// then to the identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use ocds_profile_builder::{ExtensionMetadata, ExtensionVersion};
    ///
    /// let mut ext = ExtensionVersion {
    ///     id: "ppp".into(),
    ///     date: String::new(),
    ///     version: "v1.1.3".into(),
    ///     base_url: String::new(),
    ///     download_url: String::new(),
    ///     metadata: None,
    /// };
    /// assert_eq!(ext.display_name("en"), "ppp");
    ///
    /// ext.metadata = Some(ExtensionMetadata::from_json(r#"{"name": {"en": "OCDS for PPPs Extension"}}"#).unwrap());
    /// assert_eq!(ext.display_name("fr"), "OCDS for PPPs Extension");
    /// ```
    pub fn display_name(&self, language: &str) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.name.get(language).or_else(|| m.name.get("en")))
            .map_or(self.id.as_str(), String::as_str)
    }
}

/// A row of `extension_versions.csv`.
#[derive(Debug, Deserialize)]
struct RegistryRow {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Date", default)]
    date: String,
    #[serde(rename = "Version")]
    version: String,
    #[serde(rename = "Base URL")]
    base_url: String,
    #[serde(rename = "Download URL", default)]
    download_url: String,
}

/// The parsed extension registry.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    versions: Vec<ExtensionVersion>,
}

impl ExtensionRegistry {
    /// Parses the content of `extension_versions.csv`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::CsvError`] if a row is malformed.
    pub fn from_csv(content: &str) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let mut versions = Vec::new();
        for row in reader.deserialize() {
            let row: RegistryRow = row?;
            versions.push(ExtensionVersion {
                id: row.id,
                date: row.date,
                version: row.version,
                base_url: row.base_url,
                download_url: row.download_url,
                metadata: None,
            });
        }
        tracing::debug!(versions = versions.len(), "parsed extension registry");
        Ok(Self { versions })
    }

    /// Fetches and parses the registry under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns the source's error if the registry file cannot be fetched, or
    /// [`BuildError::CsvError`] if it is malformed.
    pub fn fetch(base_url: &str, source: &dyn ContentSource) -> Result<Self> {
        Self::from_csv(&source.fetch(&registry_url(base_url))?)
    }

    /// Looks up an extension version.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::ExtensionNotFound`] if the registry has no such
    /// identifier and version.
    pub fn get(&self, id: &str, version: &str) -> Result<&ExtensionVersion> {
        self.versions
            .iter()
            .find(|v| v.id == id && v.version == version)
            .ok_or_else(|| BuildError::ExtensionNotFound {
                id: id.to_string(),
                version: version.to_string(),
            })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExtensionVersion> {
        self.versions.iter()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
