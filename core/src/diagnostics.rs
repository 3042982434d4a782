//! Structured informational events produced while resolving a profile.
//!
//! Deprecated-code skips and ignored redundant patches are not errors, but
//! callers (and tests) need to see them. Resolvers push them into a
//! [`Diagnostics`] stream that is returned alongside the resolved data; each
//! event is also forwarded to `tracing` at info level.

use serde::{Deserialize, Serialize};

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
}

/// A single informational event with optional context fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Codelist filename the event concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codelist: Option<String>,
    /// Code the event concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Display name of the contributing extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl Diagnostic {
    /// Creates an informational event.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
            codelist: None,
            code: None,
            extension: None,
        }
    }

    pub fn with_codelist(mut self, codelist: impl Into<String>) -> Self {
        self.codelist = Some(codelist.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }
}

/// Ordered stream of [`Diagnostic`] events.
///
/// # Examples
///
/// ```
/// use ocds_profile_core::{Diagnostic, Diagnostics, Severity};
///
/// let mut diagnostics = Diagnostics::new();
/// diagnostics.push(Diagnostic::info("... skipping deprecated code x in y.csv"));
/// assert_eq!(diagnostics.len(), 1);
/// assert_eq!(diagnostics.messages(), vec!["... skipping deprecated code x in y.csv"]);
/// assert!(diagnostics.iter().all(|d| d.severity == Severity::Info));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event and emits it through `tracing`.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::info!(
            codelist = diagnostic.codelist.as_deref(),
            code = diagnostic.code.as_deref(),
            "{}",
            diagnostic.message
        );
        self.0.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    /// Returns the messages in emission order.
    pub fn messages(&self) -> Vec<&str> {
        self.0.iter().map(|d| d.message.as_str()).collect()
    }

    pub fn last(&self) -> Option<&Diagnostic> {
        self.0.last()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for Diagnostics {
    type Output = Diagnostic;

    fn index(&self, index: usize) -> &Diagnostic {
        &self.0[index]
    }
}
