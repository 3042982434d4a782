//! Codelist tables and rows.
//!
//! A codelist is a table of codes distributed as a CSV file. The file name
//! tells what the table does to the profile:
//!
//! - `name.csv` is a full codelist (new, or a replacement of the standard's);
//! - `+name.csv` adds its rows to `name.csv`;
//! - `-name.csv` removes its codes from `name.csv`.
//!
//! Rows coming from different extensions may carry different columns, so a
//! row is an ordered column→value map and the column union of a table is only
//! computed when it is written out.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{ResolveError, Result};

/// Extension name stamped on the standard's own codelists.
pub const CORE_EXTENSION_NAME: &str = "OCDS Core";
/// Column holding the code of a row.
pub const CODE_COLUMN: &str = "Code";
/// Column marking a code as deprecated when non-empty.
pub const DEPRECATED_COLUMN: &str = "Deprecated";
/// Column materialized from the contributing extension's name on output.
pub const EXTENSION_COLUMN: &str = "Extension";

/// What a codelist file does to the profile, derived from its name.
///
/// # Examples
///
/// ```
/// use ocds_profile_core::CodelistKind;
///
/// assert_eq!(CodelistKind::of("partyRole.csv"), CodelistKind::Full);
/// assert_eq!(CodelistKind::of("+partyRole.csv"), CodelistKind::Addend);
/// assert_eq!(CodelistKind::of("-partyRole.csv"), CodelistKind::Subtrahend);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodelistKind {
    /// A new codelist or a replacement of an existing one.
    Full,
    /// Rows to append to the base codelist.
    Addend,
    /// Codes to remove from the base codelist.
    Subtrahend,
}

impl CodelistKind {
    pub fn of(name: &str) -> Self {
        if name.starts_with('+') {
            Self::Addend
        } else if name.starts_with('-') {
            Self::Subtrahend
        } else {
            Self::Full
        }
    }

    pub fn is_patch(self) -> bool {
        self != Self::Full
    }
}

/// Strips a leading `+` or `-` from a codelist filename.
pub fn basename(name: &str) -> &str {
    name.strip_prefix(&['+', '-'][..]).unwrap_or(name)
}

/// One code of a codelist, tagged with the extension that contributed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodelistRow {
    data: IndexMap<String, String>,
    extension_name: String,
}

impl CodelistRow {
    /// Creates a row from column/value pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use ocds_profile_core::CodelistRow;
    ///
    /// let row = CodelistRow::new(
    ///     [("Code", "tender"), ("Title", "Tender")],
    ///     "OCDS Core",
    /// );
    /// assert_eq!(row.code(), "tender");
    /// assert_eq!(row.get("Title"), Some("Tender"));
    /// assert_eq!(row.get("Description"), None);
    /// assert_eq!(row.extension_name(), "OCDS Core");
    /// ```
    pub fn new<K, V>(
        data: impl IntoIterator<Item = (K, V)>,
        extension_name: impl Into<String>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            data: data
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            extension_name: extension_name.into(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.data.get(column).map(String::as_str)
    }

    /// Sets a column, keeping its position if it already exists.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.data.insert(column.into(), value.into());
    }

    /// Removes a column and returns its value.
    pub fn pop(&mut self, column: &str) -> Option<String> {
        self.data.shift_remove(column)
    }

    /// Returns the row's code, or `""` if the row has no `Code` value.
    pub fn code(&self) -> &str {
        self.get(CODE_COLUMN).unwrap_or_default()
    }

    pub fn extension_name(&self) -> &str {
        &self.extension_name
    }

    /// Returns the columns this row defines, in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn data(&self) -> &IndexMap<String, String> {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if the `Deprecated` column is present and non-empty.
    pub fn is_deprecated(&self) -> bool {
        self.get(DEPRECATED_COLUMN).is_some_and(|v| !v.is_empty())
    }

    /// Lays the row out along `fieldnames`, leaving missing columns empty.
    ///
    /// The `Extension` column is filled from the row's extension name unless
    /// the row carries its own value.
    pub fn to_record(&self, fieldnames: &[String]) -> Vec<String> {
        fieldnames
            .iter()
            .map(|field| match self.get(field) {
                Some(value) => value.to_string(),
                None if field == EXTENSION_COLUMN => self.extension_name.clone(),
                None => String::new(),
            })
            .collect()
    }
}

/// A named, ordered sequence of [`CodelistRow`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodelistTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<CodelistRow>,
}

impl CodelistTable {
    /// Creates an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Parses CSV `content` into a table whose rows are stamped with
    /// `extension_name`.
    ///
    /// Deprecated codes are dropped (one diagnostic per dropped code) and the
    /// `Deprecated` column is removed.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Csv`] for malformed CSV and
    /// [`ResolveError::MissingCodeColumn`] if the header has no `Code`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ocds_profile_core::{CodelistTable, Diagnostics};
    ///
    /// let csv = "Code,Title,Deprecated\nopen,Open,\nold,Old,1.1\n";
    /// let mut diagnostics = Diagnostics::new();
    /// let table = CodelistTable::parse("method.csv", csv, "OCDS Core", &mut diagnostics).unwrap();
    ///
    /// assert_eq!(table.codes(), vec!["open"]);
    /// assert_eq!(table.fieldnames(), vec!["Code", "Title", "Extension"]);
    /// assert_eq!(diagnostics.messages(), vec!["... skipping deprecated code old in method.csv"]);
    /// ```
    pub fn parse(
        name: impl Into<String>,
        content: &str,
        extension_name: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self> {
        let name = name.into();
        let csv_error = |source| ResolveError::Csv {
            name: name.clone(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();

        if !headers.iter().any(|h| h == CODE_COLUMN) {
            return Err(ResolveError::MissingCodeColumn { name: name.clone() });
        }

        // Short records get an empty value for every missing trailing column.
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            let values = record.iter().chain(std::iter::repeat(""));
            rows.push(CodelistRow::new(
                headers.iter().cloned().zip(values),
                extension_name,
            ));
        }

        let mut table = Self {
            name,
            columns: headers,
            rows,
        };
        table.remove_deprecated_codes(diagnostics);
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CodelistKind {
        CodelistKind::of(&self.name)
    }

    /// Returns the name of the codelist this table targets.
    pub fn basename(&self) -> &str {
        basename(&self.name)
    }

    pub fn is_patch(&self) -> bool {
        self.kind().is_patch()
    }

    pub fn is_addend(&self) -> bool {
        self.kind() == CodelistKind::Addend
    }

    pub fn is_subtrahend(&self) -> bool {
        self.kind() == CodelistKind::Subtrahend
    }

    pub fn rows(&self) -> &[CodelistRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CodelistRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the codes in row order, duplicates included.
    pub fn codes(&self) -> Vec<&str> {
        self.rows.iter().map(CodelistRow::code).collect()
    }

    /// Returns the names of the contributing extensions, without duplicates,
    /// in row order.
    pub fn extension_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !names.contains(&row.extension_name()) {
                names.push(row.extension_name());
            }
        }
        names
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.rows.iter().any(|row| row.code() == code)
    }

    /// Returns the declared columns: the CSV header(s) this table was built
    /// from, without `Deprecated` and without the materialized `Extension`.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the union of declared and row columns followed by `Extension`.
    pub fn fieldnames(&self) -> Vec<String> {
        let mut fields: IndexMap<&str, ()> = IndexMap::new();
        for column in &self.columns {
            fields.insert(column, ());
        }
        for row in &self.rows {
            for column in row.columns() {
                fields.insert(column, ());
            }
        }
        fields.insert(EXTENSION_COLUMN, ());
        fields.into_keys().map(str::to_string).collect()
    }

    /// Appends the rows (and declared columns) of `other`.
    pub fn extend(&mut self, other: CodelistTable) {
        for column in other.columns {
            if !self.columns.contains(&column) {
                self.columns.push(column);
            }
        }
        self.rows.extend(other.rows);
    }

    /// Replaces every row with the rows of `other`, keeping this table's name.
    pub fn replace_rows(&mut self, other: CodelistTable) {
        self.columns = other.columns;
        self.rows = other.rows;
    }

    /// Removes every row whose code is in `codes`. Returns the number removed.
    pub fn remove_codes(&mut self, codes: &HashSet<&str>) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| !codes.contains(row.code()));
        before - self.rows.len()
    }

    /// Drops deprecated rows and the `Deprecated` column.
    ///
    /// Running it again on the result is a no-op.
    pub fn remove_deprecated_codes(&mut self, diagnostics: &mut Diagnostics) {
        let name = &self.name;
        self.rows.retain_mut(|row| {
            if row.pop(DEPRECATED_COLUMN).is_some_and(|v| !v.is_empty()) {
                diagnostics.push(
                    Diagnostic::info(format!(
                        "... skipping deprecated code {} in {}",
                        row.code(),
                        name
                    ))
                    .with_codelist(name.as_str())
                    .with_code(row.code())
                    .with_extension(row.extension_name()),
                );
                false
            } else {
                true
            }
        });
        self.columns.retain(|c| c != DEPRECATED_COLUMN);
    }
}

impl std::ops::Index<usize> for CodelistTable {
    type Output = CodelistRow;

    fn index(&self, index: usize) -> &CodelistRow {
        &self.rows[index]
    }
}

impl<'a> IntoIterator for &'a CodelistTable {
    type Item = &'a CodelistRow;
    type IntoIter = std::slice::Iter<'a, CodelistRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
