//! Error types for profile building.
//!
//! Provides a unified error type covering all failure modes: I/O,
//! serialization, registry lookups, missing files and the resolution errors
//! of [`ocds_profile_core`].

use ocds_profile_core::ResolveError;
use thiserror::Error;

/// Errors that can occur while building a profile.
#[derive(Debug, Error)]
pub enum BuildError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// CSV parsing or writing failure outside a codelist (e.g. the registry).
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Codelists or schema patches of the profile are inconsistent.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The registry has no entry for the requested extension version.
    #[error("extension {id} version {version} not found in the registry")]
    ExtensionNotFound { id: String, version: String },

    /// A content source has nothing at the requested location.
    #[error("file not found: {location}")]
    MissingFile { location: String },

    /// The standard has no file with the requested name under `schema/`.
    #[error("file {name} not found in the standard")]
    MissingStandardFile { name: String },

    /// Profile configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for results with [`BuildError`].
pub type Result<T> = std::result::Result<T, BuildError>;
