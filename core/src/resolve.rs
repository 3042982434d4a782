//! Codelist resolution across extensions.
//!
//! Resolution runs in three steps:
//!
//! 1. [`CodelistCollector`] gathers each extension's codelists in
//!    registration order. Additions (`+name.csv`) and removals
//!    (`-name.csv`) from several extensions are concatenated; full codelists
//!    (`name.csv`) shipped by several extensions must be byte-identical.
//! 2. [`collapse_redundant_patches`] drops `+name.csv` / `-name.csv` when a
//!    full `name.csv` is also contributed, after checking that the
//!    replacement already reflects them.
//! 3. [`apply_codelist_patches`] applies what is left to the standard's
//!    codelists.
//!
//! # Example
//!
//! ```
//! use ocds_profile_core::*;
//!
//! let mut diagnostics = Diagnostics::new();
//! let standard = standard_codelists(
//!     [("codelists/partyRole.csv", "Code,Title,Description\nbuyer,Buyer,\npayer,Payer,\n")],
//!     &mut diagnostics,
//! )
//! .unwrap();
//!
//! let mut collector = CodelistCollector::new();
//! collector
//!     .add("+partyRole.csv", "Code,Title,Description\nenquirer,Enquirer,\n", "Enquiries", &mut diagnostics)
//!     .unwrap();
//! collector
//!     .add("-partyRole.csv", "Code,Title,Description\nbuyer,Buyer,\n", "PPP", &mut diagnostics)
//!     .unwrap();
//!
//! let patches = collector.finish(&mut diagnostics).unwrap();
//! let patched = apply_codelist_patches(standard, patches).unwrap();
//! assert_eq!(patched["partyRole.csv"].codes(), vec!["payer", "enquirer"]);
//! ```

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::codelist::{
    CODE_COLUMN, CORE_EXTENSION_NAME, CodelistKind, CodelistRow, CodelistTable, basename,
};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{ResolveError, Result};

/// Codelists keyed by filename, in insertion order.
pub type CodelistSet = IndexMap<String, CodelistTable>;

/// Columns that an additive patch must share with its target codelist.
const SHARED_COLUMNS: [&str; 3] = [CODE_COLUMN, "Title", "Description"];

/// Parses the standard's codelists out of its schema files.
///
/// Selects every `.csv` file with a `codelists` directory in its path, in
/// path order, stamped with [`CORE_EXTENSION_NAME`].
///
/// # Errors
///
/// Returns the first parse error, see [`CodelistTable::parse`].
pub fn standard_codelists<'a>(
    files: impl IntoIterator<Item = (&'a str, &'a str)>,
    diagnostics: &mut Diagnostics,
) -> Result<CodelistSet> {
    let mut files: Vec<(&str, &str)> = files
        .into_iter()
        .filter(|(path, _)| is_codelist_path(path))
        .collect();
    files.sort_by(|a, b| a.0.cmp(b.0));

    let mut codelists = CodelistSet::new();
    for (path, content) in files {
        let name = path.rsplit('/').next().unwrap_or(path);
        let table = CodelistTable::parse(name, content, CORE_EXTENSION_NAME, diagnostics)?;
        codelists.insert(name.to_string(), table);
    }
    Ok(codelists)
}

fn is_codelist_path(path: &str) -> bool {
    let mut components = path.split('/').collect::<Vec<_>>();
    let Some(name) = components.pop() else {
        return false;
    };
    name.ends_with(".csv") && components.contains(&"codelists")
}

/// Where a full codelist was first seen, for the cross-extension identity
/// check.
#[derive(Debug, Clone)]
struct Origin {
    digest: Vec<u8>,
    extension_name: String,
}

/// Collects codelist contributions from extensions, in registration order.
#[derive(Debug, Clone, Default)]
pub struct CodelistCollector {
    codelists: CodelistSet,
    origins: HashMap<String, Origin>,
}

impl CodelistCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the codelist `name` with raw CSV `content` contributed by
    /// `extension_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InconsistentCodelist`] if a full codelist with
    /// the same name was already contributed with different content, or a
    /// parse error from [`CodelistTable::parse`].
    pub fn add(
        &mut self,
        name: &str,
        content: &str,
        extension_name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let digest = Sha256::digest(content.as_bytes()).to_vec();

        if CodelistKind::of(name) == CodelistKind::Full {
            if let Some(origin) = self.origins.get(name) {
                if origin.digest != digest {
                    return Err(ResolveError::InconsistentCodelist {
                        name: name.to_string(),
                        first: origin.extension_name.clone(),
                        second: extension_name.to_string(),
                    });
                }
                tracing::debug!(codelist = name, extension = extension_name, "identical codelist");
                return Ok(());
            }
        }

        let table = CodelistTable::parse(name, content, extension_name, diagnostics)?;
        match self.codelists.get_mut(name) {
            Some(existing) => existing.extend(table),
            None => {
                self.codelists.insert(name.to_string(), table);
                self.origins.insert(
                    name.to_string(),
                    Origin {
                        digest,
                        extension_name: extension_name.to_string(),
                    },
                );
            }
        }
        Ok(())
    }

    /// Returns the contributions collected so far, before collapsing.
    pub fn collected(&self) -> &CodelistSet {
        &self.codelists
    }

    /// Consumes the collector, returning contributions before collapsing.
    pub fn into_collected(self) -> CodelistSet {
        self.codelists
    }

    /// Consumes the collector, returning contributions with redundant
    /// patches removed. See [`collapse_redundant_patches`].
    pub fn finish(self, diagnostics: &mut Diagnostics) -> Result<CodelistSet> {
        let mut codelists = self.codelists;
        collapse_redundant_patches(&mut codelists, diagnostics)?;
        Ok(codelists)
    }
}

/// Removes `+name.csv` and `-name.csv` entries made redundant by a full
/// `name.csv` in the same set.
///
/// A replacement must already contain every added code and none of the
/// removed codes.
///
/// # Errors
///
/// Returns [`ResolveError::AddedCodeMissing`] or
/// [`ResolveError::RemovedCodePresent`] if the replacement disagrees with
/// the patch.
pub fn collapse_redundant_patches(
    codelists: &mut CodelistSet,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let names: Vec<String> = codelists.keys().cloned().collect();

    for name in names {
        let kind = CodelistKind::of(&name);
        let base = basename(&name);
        if !kind.is_patch() {
            continue;
        }
        let Some(replacement) = codelists.get(base) else {
            continue;
        };
        let codes: HashSet<&str> = replacement.codes().into_iter().collect();
        let patch = &codelists[name.as_str()];

        let message = if kind == CodelistKind::Addend {
            if let Some(row) = patch.iter().find(|row| !codes.contains(row.code())) {
                return Err(ResolveError::AddedCodeMissing {
                    code: row.code().to_string(),
                    patch: name.clone(),
                    extension: row.extension_name().to_string(),
                    base: base.to_string(),
                    base_extension: replacement.extension_names().join(", "),
                });
            }
            format!("{base} has the codes added by {name}, ignoring {name}")
        } else {
            if let Some(row) = patch.iter().find(|row| codes.contains(row.code())) {
                let base_extension = replacement
                    .iter()
                    .find(|kept| kept.code() == row.code())
                    .map_or("", CodelistRow::extension_name);
                return Err(ResolveError::RemovedCodePresent {
                    code: row.code().to_string(),
                    patch: name.clone(),
                    extension: row.extension_name().to_string(),
                    base: base.to_string(),
                    base_extension: base_extension.to_string(),
                });
            }
            format!("{base} has no codes removed by {name}, ignoring {name}")
        };

        diagnostics.push(Diagnostic::info(message).with_codelist(name.as_str()));
        codelists.shift_remove(name.as_str());
    }

    Ok(())
}

/// Applies extension contributions to the standard's codelists.
///
/// Contributions are applied once each, in order: full codelists replace
/// (or add) a codelist, additions append rows without deduplicating, and
/// removals drop every row with a removed code.
///
/// # Errors
///
/// Returns [`ResolveError::MissingBaseCodelist`] if a patch targets an
/// unknown codelist, or [`ResolveError::ColumnMismatch`] if added rows do not
/// share the target's `Code`/`Title`/`Description` columns.
pub fn apply_codelist_patches(mut codelists: CodelistSet, patches: CodelistSet) -> Result<CodelistSet> {
    for (name, table) in patches {
        match CodelistKind::of(&name) {
            CodelistKind::Full => match codelists.get_mut(&name) {
                Some(existing) => existing.replace_rows(table),
                None => {
                    codelists.insert(name, table);
                }
            },
            CodelistKind::Addend => {
                let Some(target) = codelists.get_mut(basename(&name)) else {
                    return Err(missing_base(&name, &table));
                };
                check_shared_columns(&name, &table, target)?;
                target.extend(table);
            }
            CodelistKind::Subtrahend => {
                let Some(target) = codelists.get_mut(basename(&name)) else {
                    return Err(missing_base(&name, &table));
                };
                let removed: HashSet<&str> = table.iter().map(|row| row.code()).collect();
                let count = target.remove_codes(&removed);
                tracing::debug!(codelist = name.as_str(), removed = count, "removed codes");
            }
        }
    }

    Ok(codelists)
}

fn missing_base(name: &str, patch: &CodelistTable) -> ResolveError {
    ResolveError::MissingBaseCodelist {
        patch: name.to_string(),
        extension: patch.extension_names().join(", "),
    }
}

fn check_shared_columns(name: &str, patch: &CodelistTable, target: &CodelistTable) -> Result<()> {
    let target_fields = target.fieldnames();
    let expected: HashSet<&str> = shared_columns(target_fields.iter().map(String::as_str));

    for row in patch {
        if shared_columns(row.columns()) != expected {
            return Err(ResolveError::ColumnMismatch {
                patch: name.to_string(),
                extension: row.extension_name().to_string(),
                base: target.name().to_string(),
            });
        }
    }
    Ok(())
}

fn shared_columns<'a>(columns: impl Iterator<Item = &'a str>) -> HashSet<&'a str> {
    columns.filter(|c| SHARED_COLUMNS.contains(c)).collect()
}
