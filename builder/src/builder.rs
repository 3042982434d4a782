//! The profile builder.
//!
//! [`ProfileBuilder`] resolves the configured extension versions against the
//! registry, fetches their files, and drives the codelist and schema
//! resolvers of [`ocds_profile_core`].
//!
//! Extension files are fetched in parallel but always folded in configured
//! order. The standard's files and the fetched extension files are each
//! loaded once per builder and reused afterwards.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use ocds_profile_core::{
    CodelistCollector, CodelistSet, Diagnostics, SchemaResolver, apply_codelist_patches,
    parse_json, standard_codelists,
};
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ProfileConfig;
use crate::error::{BuildError, Result};
use crate::registry::{ExtensionMetadata, ExtensionRegistry, ExtensionVersion};
use crate::source::{ContentSource, StandardFiles};

/// Name of the release schema, both in the standard and in extensions.
pub const RELEASE_SCHEMA: &str = "release-schema.json";

/// A resolved value with the informational events produced resolving it.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

/// Every artifact of a profile, resolved in a single pass.
#[derive(Debug, Clone)]
pub struct Profile {
    /// The resolved extension versions, with their metadata, in order.
    pub extensions: Vec<ExtensionVersion>,
    /// The consolidated schema patch of all extensions.
    pub release_schema_patch: Value,
    /// The standard's release schema with the consolidated patch applied.
    pub patched_release_schema: Value,
    /// Codelists contributed by extensions, before redundant patches are
    /// dropped.
    pub extension_codelists: CodelistSet,
    /// The standard's codelists with every contribution applied.
    pub patched_codelists: CodelistSet,
    pub diagnostics: Diagnostics,
}

/// An extension version with the raw content of the files it contributes.
#[derive(Debug, Clone)]
struct FetchedExtension {
    descriptor: ExtensionVersion,
    release_schema: Option<String>,
    codelists: Vec<(String, String)>,
}

/// Builds a profile from a configuration and content collaborators.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use ocds_profile_builder::{MemorySource, ProfileBuilder, ProfileConfig};
///
/// let config = ProfileConfig::new("1__1__3").with_registry_base_url("https://registry/");
/// let source = MemorySource::new()
///     .with_file("https://registry/extension_versions.csv", "Id,Date,Version,Base URL,Download URL\n");
/// let standard = BTreeMap::from([
///     ("release-schema.json".to_string(), r#"{"properties": {}}"#.to_string()),
///     ("codelists/method.csv".to_string(), "Code,Title,Description\nopen,Open,\n".to_string()),
/// ]);
///
/// let builder = ProfileBuilder::new(config, source, standard);
/// let profile = builder.build().unwrap();
/// assert!(profile.extensions.is_empty());
/// assert_eq!(profile.patched_codelists["method.csv"].codes(), vec!["open"]);
/// ```
pub struct ProfileBuilder<S, F> {
    config: ProfileConfig,
    source: S,
    standard: F,
    file_cache: OnceLock<BTreeMap<String, String>>,
    fetched: OnceLock<Vec<FetchedExtension>>,
}

impl<S, F> ProfileBuilder<S, F>
where
    S: ContentSource,
    F: StandardFiles,
{
    pub fn new(config: ProfileConfig, source: S, standard: F) -> Self {
        Self {
            config,
            source,
            standard,
            file_cache: OnceLock::new(),
            fetched: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Returns the configured extension versions from the registry, with
    /// their `extension.json` metadata.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::ExtensionNotFound`] if a configured version is
    /// not in the registry, or the source's error if a file cannot be
    /// fetched.
    pub fn extensions(&self) -> Result<Vec<ExtensionVersion>> {
        Ok(self
            .fetched()?
            .iter()
            .map(|ext| ext.descriptor.clone())
            .collect())
    }

    /// Returns the consolidated release schema patch.
    ///
    /// Fields set to `null` by an extension are `null` in the patch.
    ///
    /// # Errors
    ///
    /// Returns fetch errors, or [`ResolveError::Json`] if a patch is
    /// malformed.
    ///
    /// [`ResolveError::Json`]: ocds_profile_core::ResolveError::Json
    pub fn release_schema_patch(&self) -> Result<Value> {
        Ok(self.schema_resolver()?.release_schema_patch())
    }

    /// Returns the standard's release schema with the consolidated patch
    /// applied.
    ///
    /// # Errors
    ///
    /// As [`release_schema_patch`](Self::release_schema_patch), plus
    /// [`BuildError::MissingStandardFile`] if the standard has no release
    /// schema.
    pub fn patched_release_schema(&self) -> Result<Value> {
        let resolver = self.schema_resolver()?;
        let base = parse_json(
            "release-schema.json of the standard",
            self.get_standard_file_contents(RELEASE_SCHEMA)?,
        )?;
        Ok(resolver.patched_schema(&base))
    }

    /// Returns the codelists contributed by extensions before redundant
    /// patches are dropped, for writing the profile's own codelist files.
    ///
    /// # Errors
    ///
    /// Returns fetch errors, or the collector's resolution errors.
    pub fn extension_codelists(&self) -> Result<Resolved<CodelistSet>> {
        let mut diagnostics = Diagnostics::new();
        let collector = self.collect_codelists(&mut diagnostics)?;
        Ok(Resolved {
            value: collector.into_collected(),
            diagnostics,
        })
    }

    /// Returns the codelist patches and new codelists of the extensions,
    /// with patches that a full replacement already reflects removed.
    ///
    /// # Errors
    ///
    /// Returns fetch errors, or resolution errors when extensions disagree.
    pub fn codelist_patches(&self) -> Result<Resolved<CodelistSet>> {
        let mut diagnostics = Diagnostics::new();
        let value = self
            .collect_codelists(&mut diagnostics)?
            .finish(&mut diagnostics)?;
        Ok(Resolved { value, diagnostics })
    }

    /// Returns the standard's codelists, deprecated codes removed.
    ///
    /// # Errors
    ///
    /// Returns errors reading the standard or parsing its codelists.
    pub fn standard_codelists(&self) -> Result<Resolved<CodelistSet>> {
        let mut diagnostics = Diagnostics::new();
        let files = self.standard_files()?;
        let value = standard_codelists(
            files.iter().map(|(path, content)| (path.as_str(), content.as_str())),
            &mut diagnostics,
        )?;
        Ok(Resolved { value, diagnostics })
    }

    /// Returns the standard's codelists with every extension contribution
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns fetch errors, or any resolution error.
    pub fn patched_codelists(&self) -> Result<Resolved<CodelistSet>> {
        let Resolved {
            value: standard,
            mut diagnostics,
        } = self.standard_codelists()?;
        let patches = self
            .collect_codelists(&mut diagnostics)?
            .finish(&mut diagnostics)?;
        let value = apply_codelist_patches(standard, patches)?;
        Ok(Resolved { value, diagnostics })
    }

    /// Returns the content of a file under the standard's `schema/`
    /// directory, by relative path.
    ///
    /// The standard is loaded on first use and cached for the lifetime of the
    /// builder.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingStandardFile`] if there is no such file.
    pub fn get_standard_file_contents(&self, name: &str) -> Result<&str> {
        self.standard_files()?
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| BuildError::MissingStandardFile {
                name: name.to_string(),
            })
    }

    /// Resolves every artifact of the profile.
    ///
    /// # Errors
    ///
    /// Returns the first fetch or resolution error; no partial profile is
    /// returned.
    pub fn build(&self) -> Result<Profile> {
        let Resolved {
            value: standard,
            mut diagnostics,
        } = self.standard_codelists()?;

        let collector = self.collect_codelists(&mut diagnostics)?;
        let extension_codelists = collector.collected().clone();
        let patches = collector.finish(&mut diagnostics)?;
        let patched_codelists = apply_codelist_patches(standard, patches)?;

        let resolver = self.schema_resolver()?;
        let base = parse_json(
            "release-schema.json of the standard",
            self.get_standard_file_contents(RELEASE_SCHEMA)?,
        )?;

        info!(
            extensions = self.config.extensions.len(),
            codelists = patched_codelists.len(),
            diagnostics = diagnostics.len(),
            "built profile"
        );

        Ok(Profile {
            extensions: self.extensions()?,
            release_schema_patch: resolver.release_schema_patch(),
            patched_release_schema: resolver.patched_schema(&base),
            extension_codelists,
            patched_codelists,
            diagnostics,
        })
    }

    fn standard_files(&self) -> Result<&BTreeMap<String, String>> {
        if let Some(files) = self.file_cache.get() {
            return Ok(files);
        }
        let files = self.standard.schema_files(&self.config.standard_version)?;
        info!(
            version = self.config.standard_version.as_str(),
            files = files.len(),
            "loaded standard"
        );
        Ok(self.file_cache.get_or_init(|| files))
    }

    fn fetched(&self) -> Result<&[FetchedExtension]> {
        if let Some(fetched) = self.fetched.get() {
            return Ok(fetched);
        }

        let registry = ExtensionRegistry::fetch(self.config.registry_base_url(), &self.source)?;
        let descriptors = self
            .config
            .extensions
            .iter()
            .map(|(id, version)| registry.get(id, version).cloned())
            .collect::<Result<Vec<_>>>()?;

        let fetched = descriptors
            .into_par_iter()
            .map(|descriptor| self.fetch_extension(descriptor))
            .collect::<Result<Vec<_>>>()?;

        Ok(self.fetched.get_or_init(|| fetched))
    }

    fn fetch_extension(&self, mut descriptor: ExtensionVersion) -> Result<FetchedExtension> {
        info!(id = descriptor.id.as_str(), version = descriptor.version.as_str(), "fetching extension");

        let metadata = ExtensionMetadata::from_json(&descriptor.remote("extension.json", &self.source)?)?;

        let release_schema = match descriptor.remote(RELEASE_SCHEMA, &self.source) {
            Ok(raw) => Some(raw),
            Err(BuildError::MissingFile { location }) => {
                debug!(location = location.as_str(), "extension has no release schema patch");
                None
            }
            Err(err) => return Err(err),
        };

        let codelists = metadata
            .codelists
            .iter()
            .map(|name| {
                let content = descriptor.remote(&format!("codelists/{name}"), &self.source)?;
                Ok((name.clone(), content))
            })
            .collect::<Result<Vec<_>>>()?;

        descriptor.metadata = Some(metadata);
        Ok(FetchedExtension {
            descriptor,
            release_schema,
            codelists,
        })
    }

    fn collect_codelists(&self, diagnostics: &mut Diagnostics) -> Result<CodelistCollector> {
        let mut collector = CodelistCollector::new();
        for ext in self.fetched()? {
            let extension_name = ext.descriptor.display_name(&self.config.language);
            for (name, content) in &ext.codelists {
                collector.add(name, content, extension_name, diagnostics)?;
            }
        }
        Ok(collector)
    }

    fn schema_resolver(&self) -> Result<SchemaResolver> {
        let mut resolver = SchemaResolver::new();
        for ext in self.fetched()? {
            if let Some(raw) = &ext.release_schema {
                resolver.add_patch(&ext.descriptor.id, raw)?;
            }
        }
        Ok(resolver)
    }
}
