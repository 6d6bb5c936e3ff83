//! Psq pairs: ids of consecutive, non-overlapping pages.
//!
//! The list is a header-less two-column table, one pair per line. `cat` and
//! `20cat` write it with `--psq-pairs`; `eval --psq-pairs` reads it back.

use std::io::{BufRead, Write};
use std::path::Path;

use ttm_core::table::codec::split_record;
use ttm_core::{Compression, DocumentId, FormatError, Result, TableWriter, TtmError};

/// A page and the page that follows it.
pub type PsqPair = (DocumentId, DocumentId);

/// Pair every document with the one `stride` positions later, which is the
/// first that does not overlap it.
///
/// # Examples
/// ```
/// use ttm_core::DocumentId;
/// use ttm_providers_corpus::pairs::consecutive_pairs;
///
/// let ids: Vec<DocumentId> = (0..4).map(|index| DocumentId::from_parts("a", index)).collect();
/// let pairs = consecutive_pairs(&ids, 2);
/// assert_eq!(pairs.len(), 2);
/// assert_eq!(pairs[0].1.as_str(), "a:2");
/// ```
#[must_use]
pub fn consecutive_pairs(ids: &[DocumentId], stride: usize) -> Vec<PsqPair> {
    ids.iter()
        .zip(ids.iter().skip(stride.max(1)))
        .map(|(first, second)| (first.clone(), second.clone()))
        .collect()
}

/// Write `pairs` one per line.
///
/// # Errors
/// Returns [`TtmError::Io`] when writing fails.
pub fn write_pairs<W: Write>(writer: &mut TableWriter<W>, pairs: &[PsqPair]) -> Result<()> {
    for (first, second) in pairs {
        writer.write_fields([first.as_str(), second.as_str()])?;
    }
    Ok(())
}

/// Parse a pair list. Empty lines are ignored.
///
/// # Errors
/// Returns [`FormatError::MalformedPair`] for a line without exactly two
/// fields, and [`TtmError::Io`] when reading fails.
pub fn read_pairs<R: BufRead>(reader: R, name: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| TtmError::io(name, source))?;
        if line.is_empty() {
            continue;
        }
        let mut fields = split_record(&line).into_iter();
        match (fields.next(), fields.next(), fields.len()) {
            (Some(first), Some(second), 0) => pairs.push((first, second)),
            (first, second, rest) => {
                let actual = usize::from(first.is_some()) + usize::from(second.is_some()) + rest;
                return Err(TtmError::format(
                    name,
                    FormatError::MalformedPair {
                        line: line_number,
                        actual,
                    },
                ));
            }
        }
    }
    Ok(pairs)
}

/// Read the pair list at `path`, decompressing `.gz` files.
///
/// # Errors
/// See [`read_pairs`] and [`Compression::open_reader`].
pub fn open_pairs(path: &Path) -> Result<Vec<(String, String)>> {
    let reader = Compression::open_reader(path)?;
    read_pairs(reader, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    fn ids(names: &[&str]) -> Vec<DocumentId> {
        names.iter().map(|&name| DocumentId::new(name)).collect()
    }

    #[test]
    fn paragraphs_pair_with_their_successor() {
        let pairs = consecutive_pairs(&ids(&["a:0", "a:1", "a:2"]), 1);
        let rendered: Vec<(&str, &str)> =
            pairs.iter().map(|(first, second)| (first.as_str(), second.as_str())).collect();
        assert_eq!(rendered, vec![("a:0", "a:1"), ("a:1", "a:2")]);
    }

    #[test]
    fn windows_skip_overlapping_neighbours() {
        let pairs = consecutive_pairs(&ids(&["a:0", "a:1", "a:2", "a:3", "a:4"]), 3);
        assert_eq!(pairs.len(), 2);
        assert_eq!((pairs[1].0.as_str(), pairs[1].1.as_str()), ("a:1", "a:4"));
    }

    #[test]
    fn written_pairs_read_back() -> ttm_core::Result<()> {
        let pairs = consecutive_pairs(&ids(&["x\ty:0", "x\ty:1"]), 1);
        let mut writer = TableWriter::new("pairs", Vec::new());
        write_pairs(&mut writer, &pairs)?;
        let bytes = writer.into_inner();
        let read = read_pairs(Cursor::new(bytes), "pairs")?;
        assert_eq!(read, vec![("x\ty:0".to_owned(), "x\ty:1".to_owned())]);
        Ok(())
    }

    #[rstest]
    #[case("a\tb\nc\n", 1, 1)]
    #[case("a\tb\tc\n", 0, 3)]
    fn malformed_lines_name_their_position(
        #[case] text: &str,
        #[case] line: usize,
        #[case] actual: usize,
    ) {
        let err = read_pairs(Cursor::new(text.as_bytes().to_vec()), "pairs").expect_err("malformed");
        assert!(matches!(
            err,
            TtmError::Format { error: FormatError::MalformedPair { line: found, actual: fields }, .. }
                if found == line && fields == actual
        ));
    }
}
