//! Building OCDS profiles from the extension registry.
//!
//! This crate is the I/O side of profile building. It reads the extension
//! registry and extension files through a [`ContentSource`], the standard
//! through [`StandardFiles`], and hands their raw content to the resolvers
//! of [`ocds_profile_core`].
//!
//! # Quick start
//!
//! ```no_run
//! use ocds_profile_builder::{
//!     MirrorSource, ProfileBuilder, ProfileConfig, StandardDirectory, write_profile,
//! };
//!
//! let config = ProfileConfig::load("profile.yml").unwrap();
//! let builder = ProfileBuilder::new(
//!     config,
//!     MirrorSource::new("mirror/"),
//!     StandardDirectory::new("standard/"),
//! );
//!
//! let profile = builder.build().unwrap();
//! for diagnostic in &profile.diagnostics {
//!     println!("{}", diagnostic.message);
//! }
//! write_profile("build/", &profile).unwrap();
//! ```

mod builder;
mod config;
mod error;
mod output;
mod registry;
mod source;

pub use builder::{Profile, ProfileBuilder, RELEASE_SCHEMA, Resolved};
pub use config::{DEFAULT_REGISTRY_BASE_URL, ProfileConfig};
pub use error::{BuildError, Result};
pub use output::{
    COMPILED_CODELISTS_DIR, EXTENSION_CODELISTS_DIR, PATCHED_RELEASE_SCHEMA, write_codelist,
    write_json, write_profile,
};
pub use registry::{
    ExtensionMetadata, ExtensionRegistry, ExtensionVersion, REGISTRY_FILE, registry_url,
};
pub use source::{ContentSource, MemorySource, MirrorSource, StandardDirectory, StandardFiles};
