//! Codelist and schema patch resolution for OCDS profiles.
//!
//! A profile combines a version of the standard with a set of extensions.
//! Each extension may patch the release schema (a JSON Merge Patch) and may
//! contribute codelists. This crate resolves those contributions in memory:
//!
//! - [`CodelistTable`] / [`CodelistRow`]: a codelist parsed from CSV, with
//!   deprecated codes removed and rows tagged by contributing extension.
//! - [`merge_patch`] / [`PatchTree`]: RFC 7386 merge patching, with
//!   deletions preserved while several patches are folded together.
//! - [`CodelistCollector`], [`collapse_redundant_patches`],
//!   [`apply_codelist_patches`]: the codelist resolver.
//! - [`SchemaResolver`]: the consolidated schema patch and patched schema.
//!
//! Informational events are returned as [`Diagnostics`]; fatal
//! inconsistencies between extensions are [`ResolveError`]s.
//!
//! # Example
//!
//! ```
//! use ocds_profile_core::*;
//!
//! let mut diagnostics = Diagnostics::new();
//! let standard = standard_codelists(
//!     [("codelists/initiationType.csv", "Code,Title,Description\ntender,Tender,\n")],
//!     &mut diagnostics,
//! )
//! .unwrap();
//!
//! let mut collector = CodelistCollector::new();
//! collector
//!     .add("initiationType.csv", "Code,Title,Description\nppp,PPP,\n", "OCDS for PPPs", &mut diagnostics)
//!     .unwrap();
//! let patched = apply_codelist_patches(standard, collector.finish(&mut diagnostics).unwrap()).unwrap();
//! assert_eq!(patched["initiationType.csv"].codes(), vec!["ppp"]);
//! assert_eq!(patched["initiationType.csv"][0].extension_name(), "OCDS for PPPs");
//! ```

mod codelist;
mod diagnostics;
mod error;
mod merge;
mod resolve;
mod schema;

pub use codelist::{
    CODE_COLUMN, CORE_EXTENSION_NAME, CodelistKind, CodelistRow, CodelistTable,
    DEPRECATED_COLUMN, EXTENSION_COLUMN, basename,
};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{ResolveError, Result};
pub use merge::{PatchTree, merge_patch, merged};
pub use resolve::{
    CodelistCollector, CodelistSet, apply_codelist_patches, collapse_redundant_patches,
    standard_codelists,
};
pub use schema::{SchemaResolver, parse_json};
