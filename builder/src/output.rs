//! Writing profile artifacts to disk.
//!
//! Codelists are written as CSV with the column union of their rows (rows
//! missing a column get an empty cell) and a `\n` line terminator. JSON is
//! pretty-printed with a 2-space indent, object members in document order,
//! and a trailing newline. Members end their line with a bare `,` and keys
//! are followed by `": "`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ocds_profile_core::{CodelistSet, CodelistTable};
use serde_json::Value;

use crate::builder::{Profile, RELEASE_SCHEMA};
use crate::error::Result;

/// File name of the patched release schema.
pub const PATCHED_RELEASE_SCHEMA: &str = "patched-release-schema.json";
/// Directory of the codelists contributed by extensions.
pub const EXTENSION_CODELISTS_DIR: &str = "codelists";
/// Directory of the fully patched codelists.
pub const COMPILED_CODELISTS_DIR: &str = "compiledCodelists";

/// Writes `table` as CSV.
///
/// # Examples
///
/// ```
/// use ocds_profile_builder::write_codelist;
/// use ocds_profile_core::{CodelistTable, Diagnostics};
///
/// let table = CodelistTable::parse("method.csv", "Code,Title\nopen,Open\n", "OCDS Core", &mut Diagnostics::new()).unwrap();
/// let mut out = Vec::new();
/// write_codelist(&mut out, &table).unwrap();
/// assert_eq!(String::from_utf8(out).unwrap(), "Code,Title,Extension\nopen,Open,OCDS Core\n");
/// ```
pub fn write_codelist<W: Write>(writer: W, table: &CodelistTable) -> Result<()> {
    let fieldnames = table.fieldnames();
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv.write_record(&fieldnames)?;
    for row in table {
        csv.write_record(row.to_record(&fieldnames))?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes `value` as pretty-printed JSON followed by a newline.
///
/// # Examples
///
/// ```
/// use ocds_profile_builder::write_json;
/// use serde_json::json;
///
/// let mut out = Vec::new();
/// write_json(&mut out, &json!({"b": null, "a": [1]})).unwrap();
/// assert_eq!(String::from_utf8(out).unwrap(), "{\n  \"b\": null,\n  \"a\": [\n    1\n  ]\n}\n");
/// ```
pub fn write_json<W: Write>(mut writer: W, value: &Value) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn write_json_file(path: &Path, value: &Value) -> Result<()> {
    write_json(BufWriter::new(File::create(path)?), value)
}

fn write_codelists(dir: &Path, codelists: &CodelistSet, written: &mut Vec<PathBuf>) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for (name, table) in codelists {
        let path = dir.join(name);
        write_codelist(BufWriter::new(File::create(&path)?), table)?;
        written.push(path);
    }
    Ok(())
}

/// Writes every artifact of `profile` under `dir` and returns the written
/// paths:
///
/// - `release-schema.json`: the consolidated patch;
/// - `patched-release-schema.json`: the patched schema;
/// - `codelists/`: extension contributions, `+`/`-` names kept;
/// - `compiledCodelists/`: the patched codelists.
///
/// # Errors
///
/// Returns [`IoError`](crate::BuildError::IoError) if a directory or file
/// cannot be written.
pub fn write_profile(dir: impl AsRef<Path>, profile: &Profile) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let path = dir.join(RELEASE_SCHEMA);
    write_json_file(&path, &profile.release_schema_patch)?;
    written.push(path);

    let path = dir.join(PATCHED_RELEASE_SCHEMA);
    write_json_file(&path, &profile.patched_release_schema)?;
    written.push(path);

    write_codelists(
        &dir.join(EXTENSION_CODELISTS_DIR),
        &profile.extension_codelists,
        &mut written,
    )?;
    write_codelists(
        &dir.join(COMPILED_CODELISTS_DIR),
        &profile.patched_codelists,
        &mut written,
    )?;

    tracing::info!(dir = %dir.display(), files = written.len(), "wrote profile");
    Ok(written)
}
