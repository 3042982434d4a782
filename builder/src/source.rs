//! Content collaborators: where extension files and the standard come from.
//!
//! The builder never talks to the network itself. Extension files are read
//! through a [`ContentSource`], keyed by the URL the registry gives for them,
//! and the standard's `schema/` files through [`StandardFiles`].
//!
//! - [`MirrorSource`] maps `scheme://host/path` URLs onto a directory tree
//!   (`<root>/host/path`), e.g. a `wget --mirror` of the registry and the
//!   extension repositories.
//! - [`MemorySource`] serves files from a map, for tests and embedders.
//! - [`StandardDirectory`] reads `<root>/<version>/schema/**`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{BuildError, Result};

/// Fetches the text of a file by URL.
pub trait ContentSource: Send + Sync {
    /// Returns the content at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingFile`] if there is nothing at `url`.
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Serves URLs from a local mirror directory.
///
/// # Examples
///
/// ```
/// use ocds_profile_builder::MirrorSource;
/// use std::path::Path;
///
/// let mirror = MirrorSource::new("/srv/mirror");
/// assert_eq!(
///     mirror.path_for("https://raw.githubusercontent.com/open-contracting/ocds_ppp_extension/v1.1.3/extension.json"),
///     Path::new("/srv/mirror/raw.githubusercontent.com/open-contracting/ocds_ppp_extension/v1.1.3/extension.json"),
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MirrorSource {
    root: PathBuf,
}

impl MirrorSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the mirror path of `url`. Parent-directory components are
    /// dropped so that a URL cannot escape the mirror root.
    pub fn path_for(&self, url: &str) -> PathBuf {
        let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
        let without_query = without_scheme
            .split(['?', '#'])
            .next()
            .unwrap_or(without_scheme);

        without_query
            .split('/')
            .filter(|part| !part.is_empty() && *part != "." && *part != "..")
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

impl ContentSource for MirrorSource {
    fn fetch(&self, url: &str) -> Result<String> {
        let path = self.path_for(url);
        tracing::debug!(url, path = %path.display(), "reading mirrored file");
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(BuildError::MissingFile {
                location: url.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }
}

/// Serves URLs from memory.
///
/// # Examples
///
/// ```
/// use ocds_profile_builder::{ContentSource, MemorySource};
///
/// let source = MemorySource::new().with_file("https://example.com/a.json", "{}");
/// assert_eq!(source.fetch("https://example.com/a.json").unwrap(), "{}");
/// assert!(source.fetch("https://example.com/b.json").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, content: impl Into<String>) {
        self.files.insert(url.into(), content.into());
    }

    pub fn with_file(mut self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(url, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ContentSource for MemorySource {
    fn fetch(&self, url: &str) -> Result<String> {
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| BuildError::MissingFile {
                location: url.to_string(),
            })
    }
}

/// Provides the files under the standard's `schema/` directory.
pub trait StandardFiles: Send + Sync {
    /// Returns every file under `schema/` for `version`, keyed by path
    /// relative to `schema/` with `/` separators.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the files cannot be read.
    fn schema_files(&self, version: &str) -> Result<BTreeMap<String, String>>;
}

impl StandardFiles for BTreeMap<String, String> {
    fn schema_files(&self, _version: &str) -> Result<BTreeMap<String, String>> {
        Ok(self.clone())
    }
}

/// Reads the standard from `<root>/<version>/schema/`.
#[derive(Debug, Clone)]
pub struct StandardDirectory {
    root: PathBuf,
}

impl StandardDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the `schema/` directory of `version`.
    pub fn schema_dir(&self, version: &str) -> PathBuf {
        self.root.join(version).join("schema")
    }
}

impl StandardFiles for StandardDirectory {
    fn schema_files(&self, version: &str) -> Result<BTreeMap<String, String>> {
        let dir = self.schema_dir(version);
        if !dir.is_dir() {
            return Err(BuildError::MissingFile {
                location: dir.display().to_string(),
            });
        }

        let mut files = BTreeMap::new();
        collect_files(&dir, "", &mut files)?;
        tracing::debug!(version, files = files.len(), "read standard schema files");
        Ok(files)
    }
}

fn collect_files(dir: &Path, prefix: &str, files: &mut BTreeMap<String, String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };

        if path.is_dir() {
            collect_files(&path, &relative, files)?;
        } else if let Ok(content) = std::fs::read_to_string(&path) {
            files.insert(relative, content);
        } else {
            tracing::debug!(path = %path.display(), "skipping non-text file");
        }
    }
    Ok(())
}
