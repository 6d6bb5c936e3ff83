//! On-disk fixtures: temporary directories, corpora and small tables.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Create a temporary directory, panicking on failure.
#[must_use]
pub fn temp_dir() -> TempDir {
    match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    }
}

/// Write `contents` to `root/relative`, creating parent directories.
///
/// # Errors
/// Returns any I/O error raised while creating directories or the file.
pub fn write_file(root: &Path, relative: &str, contents: &str) -> io::Result<PathBuf> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents)?;
    Ok(path)
}

/// Write every `(relative path, contents)` pair under `root`.
///
/// # Errors
/// See [`write_file`].
pub fn write_corpus(root: &Path, files: &[(&str, &str)]) -> io::Result<()> {
    for (relative, contents) in files {
        write_file(root, relative, contents)?;
    }
    Ok(())
}

/// Render a table from plain fields.
///
/// Fields are joined verbatim, so they must not contain tabs, newlines or
/// backslashes.
///
/// # Examples
/// ```
/// use ttm_test_support::fixtures::tsv;
///
/// let text = tsv(&["text"], &[("a:0", &["hello"])]);
/// assert_eq!(text, "id\ttext\na:0\thello\n");
/// ```
#[must_use]
pub fn tsv(columns: &[&str], rows: &[(&str, &[&str])]) -> String {
    let mut out = std::iter::once("id")
        .chain(columns.iter().copied())
        .collect::<Vec<_>>()
        .join("\t");
    out.push('\n');
    for (id, cells) in rows {
        out.push_str(id);
        for cell in *cells {
            out.push('\t');
            out.push_str(cell);
        }
        out.push('\n');
    }
    out
}

/// Render a vector cell the way the table codec writes it.
#[must_use]
pub fn vector_cell(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|value| format!("{value:?}")).collect();
    format!("[{}]", parts.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_corpus_creates_nested_directories() -> io::Result<()> {
        let dir = temp_dir();
        write_corpus(dir.path(), &[("a/b.txt", "one"), ("c.txt", "two")])?;
        assert_eq!(fs::read_to_string(dir.path().join("a/b.txt"))?, "one");
        assert_eq!(fs::read_to_string(dir.path().join("c.txt"))?, "two");
        Ok(())
    }

    #[test]
    fn vector_cells_keep_a_decimal_point() {
        assert_eq!(vector_cell(&[1.0, 0.5, -2.0]), "[1.0,0.5,-2.0]");
    }
}
