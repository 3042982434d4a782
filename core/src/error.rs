//! Error types for codelist and schema resolution.
//!
//! Every variant is fatal for the resolution run that produced it: the
//! extensions being combined disagree with each other or with the standard,
//! and no partial result should be used.

use thiserror::Error;

/// Errors raised while parsing contributions or resolving a profile.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A codelist's tabular content could not be parsed.
    #[error("invalid CSV in codelist {name}: {source}")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },

    /// A schema or schema patch could not be parsed.
    #[error("invalid JSON in {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A codelist has no `Code` column.
    #[error("codelist {name} has no Code column")]
    MissingCodeColumn { name: String },

    /// Two extensions ship a full codelist with the same name but different
    /// content.
    #[error("codelist {name} is different across extensions ({first}, {second})")]
    InconsistentCodelist {
        name: String,
        first: String,
        second: String,
    },

    /// A code added by an additive patch is absent from a full replacement of
    /// the same codelist.
    #[error("{code} added by {patch} ({extension}), but not in {base} ({base_extension})")]
    AddedCodeMissing {
        code: String,
        patch: String,
        extension: String,
        base: String,
        base_extension: String,
    },

    /// A code removed by a subtractive patch is still present in a full
    /// replacement of the same codelist.
    #[error("{code} removed by {patch} ({extension}), but in {base} ({base_extension})")]
    RemovedCodePresent {
        code: String,
        patch: String,
        extension: String,
        base: String,
        base_extension: String,
    },

    /// A patch targets a codelist that neither the standard nor any extension
    /// provides.
    #[error("base codelist for {patch} ({extension}) is missing")]
    MissingBaseCodelist { patch: String, extension: String },

    /// An additive patch does not carry the same columns as its target.
    #[error("codelist {patch} from {extension} has different fields than the base codelist {base}")]
    ColumnMismatch {
        patch: String,
        extension: String,
        base: String,
    },
}

/// Convenience alias for results with [`ResolveError`].
pub type Result<T> = std::result::Result<T, ResolveError>;
